//! Trust Propagation
//!
//! Extractors that rebuild the authenticated identity from the `X-User-*`
//! headers the gateway injects. No token verification happens here: a
//! service using these extractors trusts its network boundary, which means
//! it must only be reachable through the gateway. Re-validating on every
//! hop is explicitly not a goal of this layer.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gk_common::{
    ErrorBody, RoleName, TrustedIdentity, HEADER_USER_EMAIL, HEADER_USER_ID, HEADER_USER_NAME,
    HEADER_USER_ROLE,
};

/// Why an identity could not be rebuilt from the request.
#[derive(Debug)]
pub struct TrustRejection {
    status: StatusCode,
    message: String,
    path: String,
}

impl TrustRejection {
    fn unauthorized(message: impl Into<String>, parts: &Parts) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
            path: parts.uri.path().to_string(),
        }
    }

    fn forbidden(message: impl Into<String>, parts: &Parts) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
            path: parts.uri.path().to_string(),
        }
    }
}

impl IntoResponse for TrustRejection {
    fn into_response(self) -> Response {
        let category = match self.status {
            StatusCode::FORBIDDEN => "FORBIDDEN",
            _ => "UNAUTHORIZED",
        };
        let body = ErrorBody::new(self.status.as_u16(), category, self.message, self.path);
        (self.status, Json(body)).into_response()
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

fn identity_from_parts(parts: &Parts) -> Result<TrustedIdentity, TrustRejection> {
    let user_id = header(parts, HEADER_USER_ID)
        .ok_or_else(|| TrustRejection::unauthorized("Missing X-User-Id header", parts))?;
    let role_text = header(parts, HEADER_USER_ROLE)
        .ok_or_else(|| TrustRejection::unauthorized("Missing X-User-Role header", parts))?;
    let email = header(parts, HEADER_USER_EMAIL)
        .ok_or_else(|| TrustRejection::unauthorized("Missing X-User-Email header", parts))?;
    let username = header(parts, HEADER_USER_NAME)
        .ok_or_else(|| TrustRejection::unauthorized("Missing X-User-Name header", parts))?;

    let role = RoleName::parse(role_text).ok_or_else(|| {
        TrustRejection::unauthorized(format!("Unknown role in X-User-Role: {role_text}"), parts)
    })?;

    Ok(TrustedIdentity {
        user_id: user_id.to_string(),
        username: username.to_string(),
        email: email.to_string(),
        role,
    })
}

/// The gateway-validated identity, required.
///
/// Rejects with 401 when any trusted header is missing or the role is
/// unknown; the error body matches the gateway's own rejection shape.
#[derive(Debug, Clone)]
pub struct GatewayIdentity(pub TrustedIdentity);

impl<S> FromRequestParts<S> for GatewayIdentity
where
    S: Send + Sync,
{
    type Rejection = TrustRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_parts(parts).map(GatewayIdentity)
    }
}

/// The gateway-validated identity, if present.
///
/// For endpoints that serve both anonymous and authenticated callers. A
/// half-populated header set still resolves to `None`.
#[derive(Debug, Clone)]
pub struct OptionalIdentity(pub Option<TrustedIdentity>);

impl<S> FromRequestParts<S> for OptionalIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalIdentity(identity_from_parts(parts).ok()))
    }
}

/// A gateway-validated identity that must carry the ADMIN role.
///
/// Missing identity rejects 401; a non-admin identity rejects 403.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub TrustedIdentity);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = TrustRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = identity_from_parts(parts)?;
        if !identity.role.can_admin() {
            tracing::warn!(
                username = %identity.username,
                path = parts.uri.path(),
                "admin endpoint refused"
            );
            return Err(TrustRejection::forbidden(
                "Admin role required",
                parts,
            ));
        }
        Ok(RequireAdmin(identity))
    }
}
