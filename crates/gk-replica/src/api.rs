//! Replica API Endpoints
//!
//! Read-only profile lookups, all behind the gateway's trusted headers:
//! - GET /api/users/v1/me - The caller's own profile
//! - GET /api/users/v1/{id} - Profile by id (self or admin)
//! - GET /api/users/v1/by-username/{username} - Profile by username
//! - GET /api/users/v1 - All profiles (admin)

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gk_common::ErrorBody;
use gk_trust::{GatewayIdentity, RequireAdmin};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::error::ReplicaError;
use crate::profile::ProfileReplica;
use crate::store::ReplicaStore;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn ReplicaStore>,
}

pub struct ApiError {
    error: ReplicaError,
    path: String,
}

impl ApiError {
    fn at(error: ReplicaError, path: &str) -> Self {
        Self {
            error,
            path: path.to_string(),
        }
    }

    fn not_found(id: &str, path: &str) -> Self {
        Self::at(
            ReplicaError::NotFound { id: id.to_string() },
            path,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, category, message) = match &self.error {
            ReplicaError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.error.to_string())
            }
            ReplicaError::Forbidden => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", self.error.to_string())
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };
        let body = ErrorBody::new(status.as_u16(), category, message, self.path);
        (status, Json(body)).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatekit Replica API",
        description = "Read-only profile replica, populated from identity events"
    ),
    components(schemas(ProfileReplica, ErrorBody))
)]
pub struct ApiDoc;

pub fn router(state: ApiState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_me))
        .routes(routes!(get_by_id))
        .routes(routes!(get_by_username))
        .routes(routes!(list_users))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/users/v1/me",
    responses(
        (status = 200, description = "The caller's replicated profile", body = ProfileReplica),
        (status = 401, description = "No gateway identity", body = ErrorBody),
        (status = 404, description = "Profile not yet replicated", body = ErrorBody),
    ),
    tag = "users"
)]
async fn get_me(
    State(state): State<ApiState>,
    GatewayIdentity(identity): GatewayIdentity,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<ProfileReplica>, ApiError> {
    let profile = state
        .store
        .find_by_id(&identity.user_id)
        .await
        .map_err(|e| ApiError::at(e, uri.path()))?
        .ok_or_else(|| ApiError::not_found(&identity.user_id, uri.path()))?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/api/users/v1/{id}",
    params(("id" = String, Path, description = "Principal id")),
    responses(
        (status = 200, description = "Profile", body = ProfileReplica),
        (status = 403, description = "Caller is neither the subject nor an admin", body = ErrorBody),
        (status = 404, description = "No such profile", body = ErrorBody),
    ),
    tag = "users"
)]
async fn get_by_id(
    State(state): State<ApiState>,
    GatewayIdentity(identity): GatewayIdentity,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> Result<Json<ProfileReplica>, ApiError> {
    // Profiles by id are visible to their owner and to admins only.
    if identity.user_id != id && !identity.role.can_admin() {
        return Err(ApiError::at(ReplicaError::Forbidden, uri.path()));
    }
    let profile = state
        .store
        .find_by_id(&id)
        .await
        .map_err(|e| ApiError::at(e, uri.path()))?
        .ok_or_else(|| ApiError::not_found(&id, uri.path()))?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/api/users/v1/by-username/{username}",
    params(("username" = String, Path, description = "Login name")),
    responses(
        (status = 200, description = "Profile", body = ProfileReplica),
        (status = 404, description = "No such profile", body = ErrorBody),
    ),
    tag = "users"
)]
async fn get_by_username(
    State(state): State<ApiState>,
    GatewayIdentity(_identity): GatewayIdentity,
    OriginalUri(uri): OriginalUri,
    Path(username): Path<String>,
) -> Result<Json<ProfileReplica>, ApiError> {
    let profile = state
        .store
        .find_by_username(&username)
        .await
        .map_err(|e| ApiError::at(e, uri.path()))?
        .ok_or_else(|| ApiError::not_found(&username, uri.path()))?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/api/users/v1",
    responses(
        (status = 200, description = "All replicated profiles", body = [ProfileReplica]),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
    ),
    tag = "users"
)]
async fn list_users(
    State(state): State<ApiState>,
    RequireAdmin(_admin): RequireAdmin,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Vec<ProfileReplica>>, ApiError> {
    let profiles = state
        .store
        .list()
        .await
        .map_err(|e| ApiError::at(e, uri.path()))?;
    Ok(Json(profiles))
}
