use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;

pub const CSRF_TOKEN_KEY: &str = "csrf_token";

const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// CSRF token as stored in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfToken {
    pub value: String,
    pub created_at: i64,
}

impl CsrfToken {
    pub fn new() -> Self {
        Self {
            value: Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() - self.created_at > TOKEN_TTL_SECS
    }
}

impl Default for CsrfToken {
    fn default() -> Self {
        Self::new()
    }
}

fn short(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

/// Generate a new CSRF token and store it in the session
pub async fn generate_csrf_token(
    session: &Session,
) -> Result<String, tower_sessions::session::Error> {
    let token = CsrfToken::new();
    let value = token.value.clone();
    session.insert(CSRF_TOKEN_KEY, token).await?;

    debug!("Generated new CSRF token: {}", short(&value));
    Ok(value)
}

/// Returns the session's live token, minting one when absent or expired.
pub async fn get_or_create_csrf_token(
    session: &Session,
) -> Result<String, tower_sessions::session::Error> {
    let token: Option<CsrfToken> = session.get(CSRF_TOKEN_KEY).await?;

    match token {
        Some(existing) if !existing.is_expired() => Ok(existing.value),
        _ => generate_csrf_token(session).await,
    }
}

/// Checks a submitted form token against the session. Every state-changing
/// form posts one as `csrf_token`. A valid token is rotated.
pub async fn validate_csrf_form_field(session: &Session, form_token: &str) -> Result<(), AppError> {
    let stored: Option<CsrfToken> = session.get(CSRF_TOKEN_KEY).await?;

    let stored = match stored {
        Some(token) if !token.is_expired() => token,
        Some(_) => {
            warn!("CSRF token expired during form validation");
            return Err(AppError::Csrf);
        }
        None => {
            warn!("No CSRF token in session for form validation");
            return Err(AppError::Csrf);
        }
    };

    if form_token != stored.value {
        warn!(
            "CSRF form token mismatch: expected {}, got {}",
            short(&stored.value),
            short(form_token)
        );
        return Err(AppError::Csrf);
    }

    generate_csrf_token(session).await?;
    Ok(())
}
