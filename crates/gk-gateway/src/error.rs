//! Gateway Error Types
//!
//! Every authentication failure maps to 401 with the standard error body.
//! The gateway fails closed: an unreachable or slow authority is
//! indistinguishable from an invalid token as far as the client is told.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gk_common::ErrorBody;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Missing Authorization header")]
    MissingAuthorization,

    #[error("Authorization header is not a bearer token")]
    NotBearer,

    #[error("Token rejected by authority")]
    Rejected { status: u16 },

    #[error("Authority unreachable: {message}")]
    AuthorityUnreachable { message: String },

    #[error("No route for path: {path}")]
    NoRoute { path: String },

    #[error("Upstream request failed: {message}")]
    Upstream { message: String },
}

/// A `GatewayError` pinned to the request path for the response body.
pub struct GatewayRejection {
    error: GatewayError,
    path: String,
}

impl GatewayRejection {
    pub fn at(error: GatewayError, path: &str) -> Self {
        Self {
            error,
            path: path.to_string(),
        }
    }
}

impl IntoResponse for GatewayRejection {
    fn into_response(self) -> Response {
        let (status, category, message) = match &self.error {
            GatewayError::MissingAuthorization
            | GatewayError::NotBearer
            | GatewayError::Rejected { .. }
            | GatewayError::AuthorityUnreachable { .. } => {
                // Fail closed, and give the client no hint why
                (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Authentication required".to_string(),
                )
            }
            GatewayError::NoRoute { .. } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                self.error.to_string(),
            ),
            GatewayError::Upstream { .. } => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream service unavailable".to_string(),
            ),
        };

        if status == StatusCode::UNAUTHORIZED {
            tracing::info!(path = %self.path, reason = %self.error, "request rejected at gateway");
        } else {
            tracing::warn!(path = %self.path, reason = %self.error, "gateway forwarding failed");
        }

        let body = ErrorBody::new(status.as_u16(), category, message, self.path);
        (status, Json(body)).into_response()
    }
}
