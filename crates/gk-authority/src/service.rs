//! Authority Service
//!
//! Orchestrates the credential lifecycle: registration, login, token
//! refresh, gateway validation, profile updates, and account deletion.
//! Persists auth data only; profile fields pass straight through into the
//! event pipeline and live in replica stores.

use std::sync::Arc;

use chrono::Duration;
use gk_bus::EventPublisher;
use gk_common::{IdentityEvent, IdentityEventType, RoleName, TrustedIdentity};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::error::{AuthorityError, Result};
use crate::password::PasswordService;
use crate::principal::Principal;
use crate::refresh::RefreshTokenStore;
use crate::store::PrincipalStore;
use crate::token::{extract_bearer_token, TokenCodec, TokenError};

/// Registration request. Credentials are authoritative here; the profile
/// fields are carried only into the CREATED event.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,

    #[serde(flatten)]
    pub profile: ProfileFields,
}

/// Optional profile fields. Absent fields are omitted from events, and a
/// consumer's merge ignores them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

/// Public view of a principal, safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: RoleName,
}

impl From<&Principal> for UserSummary {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id.clone(),
            username: p.username.clone(),
            email: p.email.clone(),
            role: p.role,
        }
    }
}

/// The token pair returned by register, login, and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub principal: UserSummary,
}

pub struct AuthorityService {
    principals: Arc<dyn PrincipalStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    passwords: PasswordService,
    codec: TokenCodec,
    publisher: Arc<dyn EventPublisher>,
    refresh_ttl: Duration,
}

impl AuthorityService {
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        passwords: PasswordService,
        codec: TokenCodec,
        publisher: Arc<dyn EventPublisher>,
        refresh_ttl_secs: i64,
    ) -> Self {
        Self {
            principals,
            refresh_tokens,
            passwords,
            codec,
            publisher,
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// Register a new principal and publish the CREATED event.
    ///
    /// Publish failure does not fail the registration; the outcome is
    /// logged and the client still gets its tokens.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthTokens> {
        validate_username(&request.username)?;
        validate_email(&request.email)?;
        let password_hash = self.passwords.hash_password(&request.password)?;

        let principal = Principal::new(&request.username, &request.email, password_hash);
        let principal = self.principals.insert(principal).await?;
        info!(username = %principal.username, "principal registered");

        let event = self.profile_event(&principal, IdentityEventType::Created, &request.profile);
        self.publisher.publish(&event).await.log("register");

        self.issue_tokens(&principal).await
    }

    /// Authenticate by username and password.
    ///
    /// Unknown username, wrong password, and a disabled account are all
    /// indistinguishable to the caller: authentication failures never say
    /// which check failed.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthTokens> {
        let principal = self
            .principals
            .find_by_username(username)
            .await?
            .ok_or(AuthorityError::InvalidCredentials)?;

        if !self
            .passwords
            .verify_password(password, &principal.password_hash)?
        {
            return Err(AuthorityError::InvalidCredentials);
        }

        if !principal.enabled {
            return Err(AuthorityError::InvalidCredentials);
        }

        info!(username = %principal.username, "login succeeded");
        self.issue_tokens(&principal).await
    }

    /// Exchange a live refresh token for a fresh access token.
    ///
    /// The refresh token is not rotated: the same token stays valid until
    /// it expires or a new login replaces it.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens> {
        let record = self.refresh_tokens.verify_not_expired(refresh_token).await?;

        let principal = self
            .principals
            .find_by_id(&record.principal_id)
            .await?
            .ok_or(AuthorityError::InvalidRefreshToken)?;

        if !principal.enabled {
            return Err(AuthorityError::InvalidCredentials);
        }

        let access = self
            .codec
            .issue(&principal.username, principal.role)
            .map_err(token_issue_error)?;

        Ok(AuthTokens {
            access_token: access.token,
            refresh_token: record.token,
            token_type: "Bearer".to_string(),
            expires_in: access.expires_in,
            principal: UserSummary::from(&principal),
        })
    }

    /// Validate a bearer token for the gateway and return the identity to
    /// inject as trusted headers.
    ///
    /// The principal is re-read on every call, so a role change or account
    /// disablement takes effect before the token expires.
    pub async fn validate_bearer(&self, auth_header: &str) -> Result<TrustedIdentity> {
        let token = extract_bearer_token(auth_header).ok_or_else(|| AuthorityError::InvalidToken {
            message: "Authorization header is not a bearer token".to_string(),
        })?;

        let claims = self.codec.verify(token).map_err(|e| match e {
            TokenError::Expired => AuthorityError::TokenExpired,
            other => AuthorityError::InvalidToken {
                message: other.to_string(),
            },
        })?;

        let principal = self
            .principals
            .find_by_username(&claims.sub)
            .await?
            .ok_or_else(|| AuthorityError::InvalidToken {
                message: "Token subject no longer exists".to_string(),
            })?;

        if !principal.enabled {
            return Err(AuthorityError::InvalidToken {
                message: "Token subject is disabled".to_string(),
            });
        }

        Ok(TrustedIdentity {
            user_id: principal.id,
            username: principal.username,
            email: principal.email,
            // Role comes from the store, not the token claims
            role: principal.role,
        })
    }

    /// Publish an UPDATED event carrying the caller's changed profile
    /// fields. The authority stores none of them.
    pub async fn update_profile(&self, user_id: &str, fields: ProfileFields) -> Result<()> {
        let mut principal = self
            .principals
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthorityError::PrincipalNotFound {
                id: user_id.to_string(),
            })?;

        principal.touch();
        let principal = self.principals.update(principal).await?;

        let event = self.profile_event(&principal, IdentityEventType::Updated, &fields);
        self.publisher.publish(&event).await.log("update_profile");
        Ok(())
    }

    /// Delete an account and publish the DELETED event. Admin-only; the
    /// role check lives at the API boundary.
    ///
    /// The principal row is disabled, never removed: replicas drop the
    /// profile, while the authority keeps the record so the username and
    /// email stay claimed and audit history survives.
    pub async fn delete_account(&self, user_id: &str) -> Result<()> {
        let mut principal = self
            .principals
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthorityError::PrincipalNotFound {
                id: user_id.to_string(),
            })?;

        principal.disable();
        self.principals.update(principal).await?;
        info!(user_id, "principal disabled, deletion published");

        self.publisher
            .publish(&IdentityEvent::deleted(user_id))
            .await
            .log("delete_account");
        Ok(())
    }

    async fn issue_tokens(&self, principal: &Principal) -> Result<AuthTokens> {
        let access = self
            .codec
            .issue(&principal.username, principal.role)
            .map_err(token_issue_error)?;
        let refresh = self
            .refresh_tokens
            .issue(&principal.id, self.refresh_ttl)
            .await?;

        Ok(AuthTokens {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "Bearer".to_string(),
            expires_in: access.expires_in,
            principal: UserSummary::from(principal),
        })
    }

    fn profile_event(
        &self,
        principal: &Principal,
        event_type: IdentityEventType,
        fields: &ProfileFields,
    ) -> IdentityEvent {
        let mut event = IdentityEvent::bare(&principal.id, event_type);
        event.username = Some(principal.username.clone());
        event.email = Some(principal.email.clone());
        event.first_name = fields.first_name.clone();
        event.last_name = fields.last_name.clone();
        event.phone_number = fields.phone_number.clone();
        event.date_of_birth = fields.date_of_birth.clone();
        event.address = fields.address.clone();
        event.city = fields.city.clone();
        event.state = fields.state.clone();
        event.country = fields.country.clone();
        event.postal_code = fields.postal_code.clone();
        event.role = Some(principal.role);
        event.enabled = Some(principal.enabled);
        event
    }
}

fn token_issue_error(e: TokenError) -> AuthorityError {
    AuthorityError::internal(format!("Failed to issue access token: {e}"))
}

fn validate_username(username: &str) -> Result<()> {
    if username.trim().len() < 3 {
        return Err(AuthorityError::validation(
            "Username must be at least 3 characters",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    if !email.contains('@') || email.trim().is_empty() {
        return Err(AuthorityError::validation("Invalid email address"));
    }
    Ok(())
}
