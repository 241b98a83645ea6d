//! Authority API Endpoints
//!
//! - POST /api/auth/v1/register - Create a principal and return a token pair
//! - POST /api/auth/v1/login - Password login
//! - POST /api/auth/v1/refresh - Exchange a refresh token
//! - GET /api/auth/v1/gateway/validate - Gateway-only token validation
//! - PUT /api/auth/v1/users/me/profile - Publish a profile update
//! - DELETE /api/auth/v1/admin/users/{id} - Admin account deletion

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gk_common::{ErrorBody, TrustedIdentity};
use gk_trust::{GatewayIdentity, RequireAdmin};
use serde::Deserialize;
use utoipa::{OpenApi, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::error::AuthorityError;
use crate::service::{AuthTokens, AuthorityService, ProfileFields, RegisterRequest, UserSummary};

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<AuthorityService>,
}

/// HTTP-facing error: an `AuthorityError` pinned to the request path so the
/// response body can carry it.
pub struct ApiError {
    error: AuthorityError,
    path: String,
}

impl ApiError {
    fn at(error: AuthorityError, path: &str) -> Self {
        Self {
            error,
            path: path.to_string(),
        }
    }

    fn status_and_category(&self) -> (StatusCode, &'static str) {
        match &self.error {
            AuthorityError::DuplicateUsername { .. } | AuthorityError::DuplicateEmail { .. } => {
                (StatusCode::CONFLICT, "DUPLICATE")
            }
            AuthorityError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AuthorityError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthorityError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            AuthorityError::InvalidToken { .. } => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AuthorityError::InvalidRefreshToken | AuthorityError::ExpiredRefreshToken => {
                (StatusCode::UNAUTHORIZED, "INVALID_REFRESH_TOKEN")
            }
            AuthorityError::PrincipalNotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, category) = self.status_and_category();
        // Internal details never reach the wire
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.error.to_string()
        };
        let body = ErrorBody::new(status.as_u16(), category, message, self.path);
        (status, Json(body)).into_response()
    }
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Validation response consumed by the gateway. `isAuthenticated` is always
/// true on the 200 path; failures use the standard error body instead.
#[derive(Debug, serde::Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    #[serde(flatten)]
    pub identity: TrustedIdentity,
    pub is_authenticated: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ValidateResponse {
    pub fn authenticated(identity: TrustedIdentity) -> Self {
        Self {
            identity,
            is_authenticated: true,
            timestamp: chrono::Utc::now(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatekit Authority API",
        description = "Credential storage, token lifecycle, and gateway validation"
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        RefreshRequest,
        ProfileFields,
        AuthTokens,
        UserSummary,
        TrustedIdentity,
        ValidateResponse,
        ErrorBody
    ))
)]
pub struct ApiDoc;

/// Build the authority router.
pub fn router(state: ApiState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(register))
        .routes(routes!(login))
        .routes(routes!(refresh))
        .routes(routes!(gateway_validate))
        .routes(routes!(update_profile))
        .routes(routes!(delete_user))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/auth/v1/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Principal created", body = AuthTokens),
        (status = 400, description = "Validation failure", body = ErrorBody),
        (status = 409, description = "Username or email taken", body = ErrorBody),
    ),
    tag = "auth"
)]
async fn register(
    State(state): State<ApiState>,
    OriginalUri(uri): OriginalUri,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthTokens>), ApiError> {
    let tokens = state
        .service
        .register(request)
        .await
        .map_err(|e| ApiError::at(e, uri.path()))?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

#[utoipa::path(
    post,
    path = "/api/auth/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthTokens),
        (status = 401, description = "Invalid credentials or disabled account", body = ErrorBody),
    ),
    tag = "auth"
)]
async fn login(
    State(state): State<ApiState>,
    OriginalUri(uri): OriginalUri,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthTokens>, ApiError> {
    let tokens = state
        .service
        .login(&request.username, &request.password)
        .await
        .map_err(|e| ApiError::at(e, uri.path()))?;
    Ok(Json(tokens))
}

#[utoipa::path(
    post,
    path = "/api/auth/v1/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token issued", body = AuthTokens),
        (status = 401, description = "Refresh token invalid or expired", body = ErrorBody),
    ),
    tag = "auth"
)]
async fn refresh(
    State(state): State<ApiState>,
    OriginalUri(uri): OriginalUri,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AuthTokens>, ApiError> {
    let tokens = state
        .service
        .refresh(&request.refresh_token)
        .await
        .map_err(|e| ApiError::at(e, uri.path()))?;
    Ok(Json(tokens))
}

#[utoipa::path(
    get,
    path = "/api/auth/v1/gateway/validate",
    responses(
        (status = 200, description = "Token valid; identity for header injection", body = ValidateResponse),
        (status = 401, description = "Token missing, invalid, expired, or subject disabled", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "gateway"
)]
async fn gateway_validate(
    State(state): State<ApiState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<ValidateResponse>, ApiError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::at(
                AuthorityError::InvalidToken {
                    message: "Missing Authorization header".to_string(),
                },
                uri.path(),
            )
        })?;

    let identity = state
        .service
        .validate_bearer(auth_header)
        .await
        .map_err(|e| ApiError::at(e, uri.path()))?;
    Ok(Json(ValidateResponse::authenticated(identity)))
}

#[utoipa::path(
    put,
    path = "/api/auth/v1/users/me/profile",
    request_body = ProfileFields,
    responses(
        (status = 204, description = "Profile update published"),
        (status = 401, description = "No gateway identity", body = ErrorBody),
    ),
    tag = "users"
)]
async fn update_profile(
    State(state): State<ApiState>,
    GatewayIdentity(identity): GatewayIdentity,
    OriginalUri(uri): OriginalUri,
    Json(fields): Json<ProfileFields>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .update_profile(&identity.user_id, fields)
        .await
        .map_err(|e| ApiError::at(e, uri.path()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/auth/v1/admin/users/{id}",
    params(("id" = String, Path, description = "Principal id")),
    responses(
        (status = 204, description = "Principal disabled, DELETED event published"),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "No such principal", body = ErrorBody),
    ),
    tag = "admin"
)]
async fn delete_user(
    State(state): State<ApiState>,
    RequireAdmin(_admin): RequireAdmin,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete_account(&id)
        .await
        .map_err(|e| ApiError::at(e, uri.path()))?;
    Ok(StatusCode::NO_CONTENT)
}
