//! Replica Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplicaError {
    #[error("User not found: {id}")]
    NotFound { id: String },

    #[error("Access denied")]
    Forbidden,

    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ReplicaError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReplicaError>;
