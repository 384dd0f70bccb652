use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;

use crate::auth::{Flash, SessionUser};
use crate::error::AppError;
use crate::middleware::csrf::get_or_create_csrf_token;
use super::{service_options, ServiceOption};
use crate::models::{Appointment, CalendarDay};
use crate::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    user_name: String,
    success: Option<String>,
    error: Option<String>,
    appointments: Vec<Appointment>,
    calendar: Vec<CalendarDay>,
    // Nothing is preselected when booking.
    current_date: String,
    current_time: String,
    services: Vec<ServiceOption>,
    csrf_token: String,
}

/// GET /dashboard - appointments, booking calendar and booking form
pub async fn dashboard_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let user = SessionUser::from_session(&session).await?;

    let appointments = state.appointment_service.list_for_user(user.id).await?;
    let calendar = state.calendar_service.build(state.calendar_days).await?;
    let flash = Flash::take(&session).await?;

    Ok(DashboardTemplate {
        user_name: user.name,
        success: flash.success,
        error: flash.error,
        appointments,
        calendar,
        current_date: String::new(),
        current_time: String::new(),
        services: service_options(None),
        csrf_token: get_or_create_csrf_token(&session).await?,
    })
}
