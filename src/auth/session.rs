use tower_sessions::Session;

use crate::error::AppError;
use crate::models::User;

pub const USER_ID_KEY: &str = "user_id";
pub const USER_NAME_KEY: &str = "user_name";
pub const EMAIL_KEY: &str = "email";
pub const SUCCESS_KEY: &str = "success_message";
pub const ERROR_KEY: &str = "error_message";

/// The signed-in owner, as recorded in the session at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl SessionUser {
    pub async fn from_session(session: &Session) -> Result<Self, AppError> {
        let id = session
            .get::<i64>(USER_ID_KEY)
            .await?
            .ok_or(AppError::Unauthenticated)?;
        let name = session.get::<String>(USER_NAME_KEY).await?.unwrap_or_default();
        let email = session.get::<String>(EMAIL_KEY).await?.unwrap_or_default();

        Ok(Self { id, name, email })
    }

    /// Writes the identity keys. Called on login and after profile edits.
    pub async fn store(user: &User, session: &Session) -> Result<(), AppError> {
        session.insert(USER_ID_KEY, user.id).await?;
        session.insert(USER_NAME_KEY, user.name.clone()).await?;
        session.insert(EMAIL_KEY, user.email.clone()).await?;
        Ok(())
    }
}

/// One-shot messages shown on the next rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flash {
    pub success: Option<String>,
    pub error: Option<String>,
}

impl Flash {
    pub async fn success(session: &Session, message: impl Into<String>) -> Result<(), AppError> {
        session.insert(SUCCESS_KEY, message.into()).await?;
        Ok(())
    }

    pub async fn error(session: &Session, message: impl Into<String>) -> Result<(), AppError> {
        session.insert(ERROR_KEY, message.into()).await?;
        Ok(())
    }

    /// Removes both messages from the session and returns them.
    pub async fn take(session: &Session) -> Result<Self, AppError> {
        Ok(Self {
            success: session.remove::<String>(SUCCESS_KEY).await?,
            error: session.remove::<String>(ERROR_KEY).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    #[tokio::test]
    async fn test_flash_is_consumed_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        Flash::success(&session, "Appointment booked").await.unwrap();

        let first = Flash::take(&session).await.unwrap();
        assert_eq!(first.success.as_deref(), Some("Appointment booked"));
        assert!(first.error.is_none());

        assert_eq!(Flash::take(&session).await.unwrap(), Flash::default());
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthenticated() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        assert!(matches!(
            SessionUser::from_session(&session).await,
            Err(AppError::Unauthenticated)
        ));
    }
}
