//! Authority Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthorityError {
    #[error("Username already exists: {username}")]
    DuplicateUsername { username: String },

    #[error("Email already exists: {email}")]
    DuplicateEmail { email: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token expired")]
    ExpiredRefreshToken,

    #[error("Principal not found: {id}")]
    PrincipalNotFound { id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthorityError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthorityError>;
