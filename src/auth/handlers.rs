use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};

use super::session::{Flash, SessionUser};
use crate::error::AppError;
use crate::middleware::csrf::{get_or_create_csrf_token, validate_csrf_form_field};
use crate::services::{
    auth_service::{AuthServiceError, LoginRequest},
    user_service::{CreateUserRequest, UserServiceError, MIN_PASSWORD_LEN},
};
use crate::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
struct LoginTemplate {
    error: Option<String>,
    success: Option<String>,
    email: String,
    csrf_token: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
struct RegisterTemplate {
    error: Option<String>,
    name: String,
    email: String,
    phone: String,
    min_password_len: usize,
    csrf_token: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
    csrf_token: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    name: String,
    email: String,
    #[serde(default)]
    phone: String,
    password: String,
    password_confirm: String,
    csrf_token: String,
}

async fn render_login(
    session: &Session,
    error: Option<String>,
    email: String,
) -> Result<Response, AppError> {
    let flash = Flash::take(session).await?;
    let template = LoginTemplate {
        error: error.or(flash.error),
        success: flash.success,
        email,
        csrf_token: get_or_create_csrf_token(session).await?,
    };
    Ok(template.into_response())
}

async fn render_register(
    session: &Session,
    error: Option<String>,
    form: Option<&RegisterForm>,
) -> Result<Response, AppError> {
    let template = RegisterTemplate {
        error,
        name: form.map(|f| f.name.clone()).unwrap_or_default(),
        email: form.map(|f| f.email.clone()).unwrap_or_default(),
        phone: form.map(|f| f.phone.clone()).unwrap_or_default(),
        min_password_len: MIN_PASSWORD_LEN,
        csrf_token: get_or_create_csrf_token(session).await?,
    };
    Ok(template.into_response())
}

/// GET / - login page
pub async fn login_page(session: Session) -> Result<Response, AppError> {
    render_login(&session, None, String::new()).await
}

/// POST /login
pub async fn login_handler(
    State(app_state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if validate_csrf_form_field(&session, &form.csrf_token)
        .await
        .is_err()
    {
        return render_login(
            &session,
            Some("Invalid security token. Please refresh the page and try again.".to_string()),
            form.email,
        )
        .await;
    }

    let request = LoginRequest {
        email: form.email.clone(),
        password: form.password,
    };

    match app_state.auth_service.authenticate(request).await {
        Ok(user) => {
            session.cycle_id().await?;
            SessionUser::store(&user, &session).await?;
            info!(user_id = user.id, "user logged in");
            Ok(Redirect::to("/dashboard").into_response())
        }
        Err(AuthServiceError::InvalidCredentials) => {
            warn!("failed login attempt");
            render_login(
                &session,
                Some("Invalid email or password".to_string()),
                form.email,
            )
            .await
        }
        Err(err) => Err(err.into()),
    }
}

/// GET /register
pub async fn register_page(session: Session) -> Result<Response, AppError> {
    render_register(&session, None, None).await
}

/// POST /register
pub async fn register_handler(
    State(app_state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if validate_csrf_form_field(&session, &form.csrf_token)
        .await
        .is_err()
    {
        return render_register(
            &session,
            Some("Invalid security token. Please refresh the page and try again.".to_string()),
            Some(&form),
        )
        .await;
    }

    let request = CreateUserRequest {
        name: form.name.clone(),
        email: form.email.clone(),
        phone: Some(form.phone.clone()),
        password: form.password.clone(),
        password_confirm: Some(form.password_confirm.clone()),
    };

    match app_state.user_service.create_user(request).await {
        Ok(user) => {
            info!(user_id = user.id, "account created");
            Flash::success(&session, "Account created. You can now log in.").await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => {
            let message = match err {
                UserServiceError::MissingName => "Please enter your name".to_string(),
                UserServiceError::InvalidEmail => "Please enter a valid email address".to_string(),
                UserServiceError::WeakPassword => {
                    format!("Password must be at least {MIN_PASSWORD_LEN} characters")
                }
                UserServiceError::PasswordMismatch => "Passwords do not match".to_string(),
                UserServiceError::EmailTaken => "This email is already registered".to_string(),
                other => return Err(other.into()),
            };
            render_register(&session, Some(message), Some(&form)).await
        }
    }
}

/// GET /logout
pub async fn logout_handler(session: Session) -> Result<Redirect, AppError> {
    session.flush().await?;
    Flash::success(&session, "You have been signed out").await?;
    Ok(Redirect::to("/"))
}
