//! Authority Validation Client
//!
//! Thin HTTP client for the authority's gateway-only validate endpoint.
//! The request timeout is the fail-closed bound: once it elapses, the
//! token is treated as rejected.

use std::time::Duration;

use gk_common::TrustedIdentity;
use serde::Deserialize;
use tracing::debug;

use crate::error::GatewayError;

const VALIDATE_PATH: &str = "/api/auth/v1/gateway/validate";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidatePayload {
    #[serde(flatten)]
    identity: TrustedIdentity,
    is_authenticated: bool,
}

pub struct AuthorityClient {
    http: reqwest::Client,
    validate_url: String,
}

impl AuthorityClient {
    pub fn new(authority_url: &str, validate_timeout_ms: u64) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(validate_timeout_ms))
            .build()?;
        Ok(Self {
            http,
            validate_url: format!("{}{}", authority_url.trim_end_matches('/'), VALIDATE_PATH),
        })
    }

    /// Validate the Authorization header value with the authority.
    ///
    /// Anything other than a 200 with `isAuthenticated: true` is a
    /// rejection; network failures and timeouts map to
    /// `AuthorityUnreachable`, which the caller also treats as 401.
    pub async fn validate(&self, auth_header: &str) -> Result<TrustedIdentity, GatewayError> {
        let response = self
            .http
            .get(&self.validate_url)
            .header(reqwest::header::AUTHORIZATION, auth_header)
            .send()
            .await
            .map_err(|e| GatewayError::AuthorityUnreachable {
                message: if e.is_timeout() {
                    "validation timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
            });
        }

        let payload: ValidatePayload =
            response
                .json()
                .await
                .map_err(|e| GatewayError::AuthorityUnreachable {
                    message: format!("malformed validation response: {e}"),
                })?;

        if !payload.is_authenticated {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!(username = %payload.identity.username, "token validated");
        Ok(payload.identity)
    }
}
