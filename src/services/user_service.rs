use crate::models::user::User;
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};
use std::sync::Arc;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Name is required")]
    MissingName,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password too weak (minimum 6 characters)")]
    WeakPassword,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Current password is incorrect")]
    WrongPassword,
    #[error("User not found")]
    UserNotFound,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Password hashing failed: {0}")]
    HashingError(String),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub password_confirm: Option<String>,
}

pub struct UpdatePasswordRequest {
    pub user_id: i64,
    pub current_password: Option<String>,
    pub new_password: String,
    pub new_password_confirm: Option<String>,
}

pub struct UpdateDetailsRequest {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, UserServiceError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(UserServiceError::MissingName);
        }

        let email = request.email.trim();
        self.validate_email(email)?;

        if let Some(ref confirm) = request.password_confirm {
            if request.password != *confirm {
                return Err(UserServiceError::PasswordMismatch);
            }
        }

        self.validate_password(&request.password)?;

        let password_hash = self.hash_password(&request.password)?;

        match self
            .repository
            .create_user(name, email, normalize_phone(request.phone), &password_hash)
            .await
        {
            Ok(user) => Ok(user),
            Err(RepositoryError::AlreadyExists) => Err(UserServiceError::EmailTaken),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self.repository.find_by_email(email).await?)
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    pub async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<User>, UserServiceError> {
        Ok(self.repository.list_users(limit, offset).await?)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), UserServiceError> {
        match self.repository.delete_user(id).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    /// Changes the password. When `current_password` is given it must match
    /// the stored hash; the admin CLI omits it.
    pub async fn update_password(
        &self,
        request: UpdatePasswordRequest,
    ) -> Result<(), UserServiceError> {
        if let Some(ref confirm) = request.new_password_confirm {
            if request.new_password != *confirm {
                return Err(UserServiceError::PasswordMismatch);
            }
        }

        self.validate_password(&request.new_password)?;

        if let Some(ref current) = request.current_password {
            let user = self
                .repository
                .find_by_id(request.user_id)
                .await?
                .ok_or(UserServiceError::UserNotFound)?;
            if !self.verify_password(current, &user.password_hash) {
                return Err(UserServiceError::WrongPassword);
            }
        }

        let password_hash = self.hash_password(&request.new_password)?;

        match self
            .repository
            .update_password(request.user_id, &password_hash)
            .await
        {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    /// Updates name, email, and phone. Returns the stored user.
    pub async fn update_details(
        &self,
        request: UpdateDetailsRequest,
    ) -> Result<User, UserServiceError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(UserServiceError::MissingName);
        }

        let email = request.email.trim();
        self.validate_email(email)?;

        // Check if email is already taken by another user
        if let Some(existing_user) = self.repository.find_by_email(email).await? {
            if existing_user.id != request.user_id {
                return Err(UserServiceError::EmailTaken);
            }
        }

        match self
            .repository
            .update_details(request.user_id, name, email, normalize_phone(request.phone))
            .await
        {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(UserServiceError::UserNotFound),
            Err(RepositoryError::AlreadyExists) => return Err(UserServiceError::EmailTaken),
            Err(e) => return Err(UserServiceError::RepositoryError(e)),
        }

        self.repository
            .find_by_id(request.user_id)
            .await?
            .ok_or(UserServiceError::UserNotFound)
    }

    fn validate_email(&self, email: &str) -> Result<(), UserServiceError> {
        if !email.contains('@') || email.len() > 255 || email.is_empty() {
            return Err(UserServiceError::InvalidEmail);
        }
        Ok(())
    }

    fn validate_password(&self, password: &str) -> Result<(), UserServiceError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(UserServiceError::WeakPassword);
        }
        Ok(())
    }

    fn hash_password(&self, password: &str) -> Result<String, UserServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| UserServiceError::HashingError(e.to_string()))
    }

    pub fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        if let Ok(parsed_hash) = PasswordHash::new(password_hash) {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok()
        } else {
            false
        }
    }
}
