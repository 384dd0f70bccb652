use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use super::{redirect_with_error, redirect_with_success, INVALID_TOKEN_MESSAGE};
use crate::auth::{Flash, SessionUser};
use crate::error::AppError;
use crate::middleware::csrf::{get_or_create_csrf_token, validate_csrf_form_field};
use crate::services::user_service::{
    UpdateDetailsRequest, UpdatePasswordRequest, UserServiceError, MIN_PASSWORD_LEN,
};
use crate::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "settings.html")]
struct SettingsTemplate {
    user_name: String,
    name: String,
    email: String,
    phone: String,
    min_password_len: usize,
    success: Option<String>,
    error: Option<String>,
    csrf_token: String,
}

#[derive(Deserialize)]
pub struct UpdateDetailsForm {
    name: String,
    email: String,
    #[serde(default)]
    phone: String,
    csrf_token: String,
}

#[derive(Deserialize)]
pub struct UpdatePasswordForm {
    current_password: String,
    new_password: String,
    new_password_confirm: String,
    csrf_token: String,
}

fn settings_error_message(err: &UserServiceError) -> Option<String> {
    let message = match err {
        UserServiceError::MissingName => "Please enter your name".to_string(),
        UserServiceError::InvalidEmail => "Please enter a valid email address".to_string(),
        UserServiceError::EmailTaken => "This email is already in use".to_string(),
        UserServiceError::WeakPassword => {
            format!("Password must be at least {MIN_PASSWORD_LEN} characters")
        }
        UserServiceError::PasswordMismatch => "Passwords do not match".to_string(),
        UserServiceError::WrongPassword => "Current password is incorrect".to_string(),
        _ => return None,
    };
    Some(message)
}

/// GET /settings
pub async fn show_settings_page(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let session_user = SessionUser::from_session(&session).await?;
    let user = state
        .user_service
        .find_user_by_id(session_user.id)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    let flash = Flash::take(&session).await?;
    Ok(SettingsTemplate {
        user_name: session_user.name,
        phone: user.phone_or_empty().to_string(),
        name: user.name,
        email: user.email,
        min_password_len: MIN_PASSWORD_LEN,
        success: flash.success,
        error: flash.error,
        csrf_token: get_or_create_csrf_token(&session).await?,
    })
}

/// POST /settings/details
pub async fn update_details_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateDetailsForm>,
) -> Result<Redirect, AppError> {
    let session_user = SessionUser::from_session(&session).await?;
    if validate_csrf_form_field(&session, &form.csrf_token)
        .await
        .is_err()
    {
        return redirect_with_error(&session, "/settings", INVALID_TOKEN_MESSAGE).await;
    }

    let request = UpdateDetailsRequest {
        user_id: session_user.id,
        name: form.name,
        email: form.email,
        phone: Some(form.phone),
    };

    match state.user_service.update_details(request).await {
        Ok(user) => {
            SessionUser::store(&user, &session).await?;
            info!(user_id = user.id, "profile updated");
            redirect_with_success(&session, "/settings", "Profile updated successfully").await
        }
        Err(err) => match settings_error_message(&err) {
            Some(message) => redirect_with_error(&session, "/settings", message).await,
            None => Err(err.into()),
        },
    }
}

/// POST /settings/password
pub async fn update_password_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdatePasswordForm>,
) -> Result<Redirect, AppError> {
    let session_user = SessionUser::from_session(&session).await?;
    if validate_csrf_form_field(&session, &form.csrf_token)
        .await
        .is_err()
    {
        return redirect_with_error(&session, "/settings", INVALID_TOKEN_MESSAGE).await;
    }

    if form.current_password.is_empty() {
        return redirect_with_error(&session, "/settings", "Current password is required").await;
    }

    let request = UpdatePasswordRequest {
        user_id: session_user.id,
        current_password: Some(form.current_password),
        new_password: form.new_password,
        new_password_confirm: Some(form.new_password_confirm),
    };

    match state.user_service.update_password(request).await {
        Ok(()) => {
            info!(user_id = session_user.id, "password changed");
            redirect_with_success(&session, "/settings", "Password updated successfully").await
        }
        Err(err) => match settings_error_message(&err) {
            Some(message) => redirect_with_error(&session, "/settings", message).await,
            None => Err(err.into()),
        },
    }
}
