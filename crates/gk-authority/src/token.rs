//! Access Token Codec
//!
//! Stateless encode/decode/verify of signed access tokens (HS256).
//! Verification is pure: signature plus expiry prove validity, storage is
//! never consulted. Rotating the signing key invalidates every outstanding
//! access token; there is no rotation grace period.

use chrono::{Duration, Utc};
use gk_common::RoleName;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims embedded in an access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: the principal's username
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Role at issuance time; the gateway validate endpoint re-reads the
    /// principal, so a role change takes effect without waiting for expiry.
    pub role: RoleName,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// A freshly issued access token with its remaining lifetime in seconds.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Verification failure, mapped from the underlying JWT library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed token")]
    Malformed,
}

/// Stateless token codec. Process-wide configuration: one signing secret,
/// one issuer, one access-token TTL.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, issuer: impl Into<String>, access_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            access_ttl: Duration::seconds(access_ttl_secs),
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Issue an access token for a principal: subject and role embedded,
    /// expiry a fixed duration from now.
    pub fn issue(&self, username: &str, role: RoleName) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let exp = now + self.access_ttl;

        let claims = AccessTokenClaims {
            sub: username.to_string(),
            iss: self.issuer.clone(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| TokenError::Malformed)?;

        Ok(IssuedToken {
            token,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verify a token and extract its claims. Pure and side-effect-free.
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }
}

/// Extract the bearer token from an Authorization header value.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}
