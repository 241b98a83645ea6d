//! Gateway Proxy
//!
//! The per-request pipeline: strip inbound trusted headers, short-circuit
//! public paths, validate everything else against the authority, inject
//! the trusted header set, and forward to the route's target service.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use gk_config::GatewayConfig;
use gk_common::TRUSTED_HEADERS;
use tracing::debug;

use crate::allowlist::Allowlist;
use crate::client::AuthorityClient;
use crate::error::{GatewayError, GatewayRejection};

const FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Hop-by-hop headers that never forward.
const HOP_HEADERS: [HeaderName; 4] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

/// Prefix-based route table. Longest matching prefix wins, so `/api/auth`
/// and `/api/auth/v1/admin` can target different services.
pub struct RouteTable {
    rules: Vec<gk_config::RouteRule>,
}

impl RouteTable {
    pub fn new(mut rules: Vec<gk_config::RouteRule>) -> Self {
        rules.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { rules }
    }

    pub fn target_for(&self, path: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| path.starts_with(&r.prefix))
            .map(|r| r.target.as_str())
    }
}

struct Inner {
    authority: AuthorityClient,
    allowlist: Allowlist,
    routes: RouteTable,
    http: reqwest::Client,
}

#[derive(Clone)]
pub struct GatewayState(Arc<Inner>);

impl GatewayState {
    pub fn new(config: &GatewayConfig) -> reqwest::Result<Self> {
        let authority = AuthorityClient::new(&config.authority_url, config.validate_timeout_ms)?;
        Self::from_parts(
            authority,
            Allowlist::new(config.public_paths.clone()),
            RouteTable::new(config.routes.clone()),
        )
    }

    pub fn from_parts(
        authority: AuthorityClient,
        allowlist: Allowlist,
        routes: RouteTable,
    ) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(FORWARD_TIMEOUT).build()?;
        Ok(Self(Arc::new(Inner {
            authority,
            allowlist,
            routes,
            http,
        })))
    }
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .fallback(proxy)
        .with_state(state)
}

async fn proxy(State(state): State<GatewayState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    match handle(state, request).await {
        Ok(response) => response,
        Err(error) => GatewayRejection::at(error, &path).into_response(),
    }
}

async fn handle(state: GatewayState, request: Request) -> Result<Response, GatewayError> {
    let inner = &state.0;
    let path = request.uri().path().to_string();
    let (mut parts, body) = request.into_parts();

    // Client-supplied trust headers are dropped before anything else
    for name in TRUSTED_HEADERS {
        parts.headers.remove(name);
    }

    if !inner.allowlist.is_public(&path) {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(GatewayError::MissingAuthorization)?;
        if !auth_header.starts_with("Bearer ") {
            return Err(GatewayError::NotBearer);
        }

        let identity = inner.authority.validate(auth_header).await?;
        for (name, value) in identity.header_pairs() {
            let value = HeaderValue::from_str(&value).map_err(|_| GatewayError::Rejected {
                status: StatusCode::UNAUTHORIZED.as_u16(),
            })?;
            parts.headers.insert(name, value);
        }
        debug!(path = %path, username = %identity.username, "identity headers injected");
    }

    let target = inner
        .routes
        .target_for(&path)
        .ok_or_else(|| GatewayError::NoRoute { path: path.clone() })?;

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(&path);
    let url = format!("{}{}", target.trim_end_matches('/'), path_and_query);

    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| GatewayError::Upstream {
            message: format!("failed to read request body: {e}"),
        })?;

    let upstream = inner
        .http
        .request(parts.method.clone(), &url)
        .headers(forwardable(&parts.headers))
        .body(body_bytes)
        .send()
        .await
        .map_err(|e| GatewayError::Upstream {
            message: e.to_string(),
        })?;

    let status = upstream.status();
    let headers = forwardable(upstream.headers());
    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| GatewayError::Upstream {
            message: format!("failed to read upstream body: {e}"),
        })?;

    let mut response = Response::builder()
        .status(status)
        .body(Body::from(bytes))
        .map_err(|e| GatewayError::Upstream {
            message: e.to_string(),
        })?;
    *response.headers_mut() = headers;
    Ok(response)
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if HOP_HEADERS.iter().any(|h| h == name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}
