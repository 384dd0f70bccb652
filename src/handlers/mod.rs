pub mod appointment_handlers;
pub mod dashboard_handlers;
pub mod health_handlers;
pub mod settings_handlers;

pub use appointment_handlers::{
    appointment_receipt, book_appointment, cancel_appointment, confirmation_page,
    delete_appointment, edit_appointment_page, update_appointment,
};
pub use dashboard_handlers::dashboard_handler;
pub use health_handlers::health_handler;
pub use settings_handlers::{show_settings_page, update_details_handler, update_password_handler};

use axum::response::Redirect;
use tower_sessions::Session;

use crate::auth::Flash;
use crate::error::AppError;
use crate::models::ClinicService;

const INVALID_TOKEN_MESSAGE: &str = "Invalid security token. Please refresh the page and try again.";

pub(crate) async fn redirect_with_error(
    session: &Session,
    to: &str,
    message: impl Into<String>,
) -> Result<Redirect, AppError> {
    Flash::error(session, message).await?;
    Ok(Redirect::to(to))
}

pub(crate) async fn redirect_with_success(
    session: &Session,
    to: &str,
    message: impl Into<String>,
) -> Result<Redirect, AppError> {
    Flash::success(session, message).await?;
    Ok(Redirect::to(to))
}

/// One `<option>` of the service select.
pub struct ServiceOption {
    pub label: &'static str,
    pub selected: bool,
}

pub(crate) fn service_options(selected: Option<ClinicService>) -> Vec<ServiceOption> {
    ClinicService::ALL
        .iter()
        .map(|service| ServiceOption {
            label: service.label(),
            selected: Some(*service) == selected,
        })
        .collect()
}
