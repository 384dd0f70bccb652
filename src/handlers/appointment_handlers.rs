use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info};

use super::{
    redirect_with_error, redirect_with_success, service_options, ServiceOption,
    INVALID_TOKEN_MESSAGE,
};
use crate::auth::{Flash, SessionUser};
use crate::error::AppError;
use crate::middleware::csrf::{get_or_create_csrf_token, validate_csrf_form_field};
use crate::models::{Appointment, CalendarDay, Receipt, SlotView};
use crate::services::{AppointmentRequest, BookingError, Clock};
use crate::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "appointments/confirmation.html")]
struct ConfirmationTemplate {
    user_name: String,
    success: Option<String>,
    appointment: Appointment,
}

#[derive(Template, WebTemplate)]
#[template(path = "appointments/edit.html")]
struct EditTemplate {
    user_name: String,
    error: Option<String>,
    appointment: Appointment,
    current_date: String,
    current_time: String,
    calendar: Vec<CalendarDay>,
    services: Vec<ServiceOption>,
    csrf_token: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "appointments/receipt.html")]
struct ReceiptTemplate {
    receipt: Receipt,
    printed_at: String,
}

/// Booking and edit forms. `slot` is `"<YYYY-MM-DD> <HH:MM>"` from the
/// calendar radio buttons.
#[derive(Deserialize)]
pub struct AppointmentForm {
    #[serde(default)]
    pet_name: String,
    #[serde(default)]
    service: String,
    #[serde(default)]
    slot: String,
    csrf_token: String,
}

impl AppointmentForm {
    fn to_request(&self) -> Result<AppointmentRequest, BookingError> {
        let (date, time) = self.slot.trim().split_once(' ').unwrap_or(("", ""));
        AppointmentRequest::parse(&self.pet_name, &self.service, date, time)
    }
}

#[derive(Deserialize)]
pub struct CsrfForm {
    csrf_token: String,
}

/// Turns a booking failure into a flash message on `to`.
async fn reject(session: &Session, to: &str, err: BookingError) -> Result<Redirect, AppError> {
    match &err {
        BookingError::Storage(e) => error!("booking storage failure: {}", e),
        e if e.is_rejection() => info!(redirect = to, "slot rejected: {}", e),
        _ => {}
    }
    redirect_with_error(session, to, err.user_message()).await
}

/// POST /appointments
pub async fn book_appointment(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AppointmentForm>,
) -> Result<Redirect, AppError> {
    let user = SessionUser::from_session(&session).await?;
    if validate_csrf_form_field(&session, &form.csrf_token)
        .await
        .is_err()
    {
        return redirect_with_error(&session, "/dashboard", INVALID_TOKEN_MESSAGE).await;
    }

    let request = match form.to_request() {
        Ok(request) => request,
        Err(err) => return reject(&session, "/dashboard", err).await,
    };

    match state.appointment_service.book(user.id, request).await {
        Ok(appointment) => {
            redirect_with_success(
                &session,
                &format!("/appointments/{}/confirmation", appointment.id),
                "Appointment booked successfully",
            )
            .await
        }
        Err(err) => reject(&session, "/dashboard", err).await,
    }
}

/// GET /appointments/{id}/confirmation
pub async fn confirmation_page(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let user = SessionUser::from_session(&session).await?;

    match state.appointment_service.find_for_user(user.id, id).await {
        Ok(appointment) => {
            let flash = Flash::take(&session).await?;
            Ok(ConfirmationTemplate {
                user_name: user.name,
                success: flash.success,
                appointment,
            }
            .into_response())
        }
        Err(err) => Ok(reject(&session, "/dashboard", err).await?.into_response()),
    }
}

/// GET /appointments/{id}/edit
pub async fn edit_appointment_page(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let user = SessionUser::from_session(&session).await?;

    let appointment = match state.appointment_service.find_for_user(user.id, id).await {
        Ok(appointment) if appointment.is_confirmed() => appointment,
        Ok(_) => {
            return Ok(reject(&session, "/dashboard", BookingError::NotEditable)
                .await?
                .into_response())
        }
        Err(err) => return Ok(reject(&session, "/dashboard", err).await?.into_response()),
    };

    let services = service_options(Some(appointment.service));
    let current_date = appointment.date_value();
    let current_time = appointment.time_label();

    let mut calendar = state.calendar_service.build(state.calendar_days).await?;
    // The appointment's own slot stays selectable while editing.
    if let Some(day) = calendar.iter_mut().find(|day| day.date == current_date) {
        match day.slots.iter_mut().find(|slot| slot.time == current_time) {
            Some(slot) => slot.available = true,
            None => day.slots.push(SlotView {
                time: current_time.clone(),
                available: true,
            }),
        }
    }

    let flash = Flash::take(&session).await?;
    Ok(EditTemplate {
        user_name: user.name,
        error: flash.error,
        appointment,
        current_date,
        current_time,
        calendar,
        services,
        csrf_token: get_or_create_csrf_token(&session).await?,
    }
    .into_response())
}

/// POST /appointments/{id}
pub async fn update_appointment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<AppointmentForm>,
) -> Result<Redirect, AppError> {
    let user = SessionUser::from_session(&session).await?;
    let edit_path = format!("/appointments/{id}/edit");
    if validate_csrf_form_field(&session, &form.csrf_token)
        .await
        .is_err()
    {
        return redirect_with_error(&session, &edit_path, INVALID_TOKEN_MESSAGE).await;
    }

    let request = match form.to_request() {
        Ok(request) => request,
        Err(err) => return reject(&session, &edit_path, err).await,
    };

    match state.appointment_service.update(user.id, id, request).await {
        Ok(_) => {
            redirect_with_success(&session, "/dashboard", "Appointment updated successfully").await
        }
        Err(err @ (BookingError::NotFound | BookingError::NotEditable)) => {
            reject(&session, "/dashboard", err).await
        }
        Err(err) => reject(&session, &edit_path, err).await,
    }
}

/// POST /appointments/{id}/cancel
pub async fn cancel_appointment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<CsrfForm>,
) -> Result<Redirect, AppError> {
    let user = SessionUser::from_session(&session).await?;
    if validate_csrf_form_field(&session, &form.csrf_token)
        .await
        .is_err()
    {
        return redirect_with_error(&session, "/dashboard", INVALID_TOKEN_MESSAGE).await;
    }

    match state.appointment_service.cancel(user.id, id).await {
        Ok(()) => {
            redirect_with_success(&session, "/dashboard", "Appointment cancelled successfully")
                .await
        }
        Err(err) => reject(&session, "/dashboard", err).await,
    }
}

/// POST /appointments/{id}/delete
pub async fn delete_appointment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<CsrfForm>,
) -> Result<Redirect, AppError> {
    let user = SessionUser::from_session(&session).await?;
    if validate_csrf_form_field(&session, &form.csrf_token)
        .await
        .is_err()
    {
        return redirect_with_error(&session, "/dashboard", INVALID_TOKEN_MESSAGE).await;
    }

    match state.appointment_service.delete(user.id, id).await {
        Ok(()) => {
            redirect_with_success(&session, "/dashboard", "Appointment deleted successfully").await
        }
        Err(err) => reject(&session, "/dashboard", err).await,
    }
}

/// GET /appointments/{id}/receipt
pub async fn appointment_receipt(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let user = SessionUser::from_session(&session).await?;

    match state.appointment_service.receipt(user.id, id).await {
        Ok(receipt) => {
            let printed_at = state.clock.now().format("%d/%m/%Y %H:%M").to_string();
            Ok(ReceiptTemplate {
                receipt,
                printed_at,
            }
            .into_response())
        }
        Err(err) => Ok(reject(&session, "/dashboard", err).await?.into_response()),
    }
}
