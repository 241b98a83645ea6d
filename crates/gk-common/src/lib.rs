use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod logging;

// ============================================================================
// Roles
// ============================================================================

/// Role assigned to a principal. Gatekit has exactly two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleName {
    User,
    Admin,
}

impl RoleName {
    /// Wire representation used in tokens and trusted headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::User => "USER",
            RoleName::Admin => "ADMIN",
        }
    }

    /// Parse from the wire representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Some(RoleName::User),
            "ADMIN" => Some(RoleName::Admin),
            _ => None,
        }
    }

    pub fn can_admin(&self) -> bool {
        matches!(self, RoleName::Admin)
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Trusted header contract
// ============================================================================

/// Header names injected by the gateway after successful validation.
///
/// These names MUST be stripped from inbound client requests at the gateway
/// boundary; downstream services accept them on faith.
pub const HEADER_USER_ID: &str = "X-User-Id";
pub const HEADER_USER_ROLE: &str = "X-User-Role";
pub const HEADER_USER_EMAIL: &str = "X-User-Email";
pub const HEADER_USER_NAME: &str = "X-User-Name";

/// All trusted header names, in injection order.
pub const TRUSTED_HEADERS: [&str; 4] = [
    HEADER_USER_ID,
    HEADER_USER_ROLE,
    HEADER_USER_EMAIL,
    HEADER_USER_NAME,
];

/// The identity fields carried between gateway and downstream services.
///
/// Produced by the authority's validate endpoint, transported as the
/// `X-User-*` headers, reconstructed downstream without re-verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrustedIdentity {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: RoleName,
}

impl TrustedIdentity {
    /// Header name/value pairs in injection order.
    pub fn header_pairs(&self) -> [(&'static str, String); 4] {
        [
            (HEADER_USER_ID, self.user_id.clone()),
            (HEADER_USER_ROLE, self.role.as_str().to_string()),
            (HEADER_USER_EMAIL, self.email.clone()),
            (HEADER_USER_NAME, self.username.clone()),
        ]
    }
}

// ============================================================================
// Error body
// ============================================================================

/// The structured error object every Gatekit HTTP failure returns.
///
/// Stack traces are never exposed; `error` is a short category, `message` a
/// human-readable line, `timestamp` epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ErrorBody {
    pub fn new(
        status: u16,
        error: impl Into<String>,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
            path: path.into(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// Identity events
// ============================================================================

/// Event type for identity replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentityEventType {
    Created,
    Updated,
    Deleted,
}

/// A point-in-time fact about a principal's profile, published by the
/// authority and consumed by replica services.
///
/// Keyed by `user_id` on the wire; ordering matters per key only. Profile
/// fields are optional because DELETED events carry none of them and UPDATED
/// events carry only what changed (merge ignores `None`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityEvent {
    pub user_id: String,
    pub event_type: IdentityEventType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Publication time, epoch milliseconds on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl IdentityEvent {
    /// An event with only the key, type, and timestamp set.
    pub fn bare(user_id: impl Into<String>, event_type: IdentityEventType) -> Self {
        Self {
            user_id: user_id.into(),
            event_type,
            username: None,
            email: None,
            first_name: None,
            last_name: None,
            phone_number: None,
            date_of_birth: None,
            address: None,
            city: None,
            state: None,
            country: None,
            postal_code: None,
            role: None,
            enabled: None,
            timestamp: Utc::now(),
        }
    }

    /// A DELETED event carries only the key and the timestamp.
    pub fn deleted(user_id: impl Into<String>) -> Self {
        Self::bare(user_id, IdentityEventType::Deleted)
    }

    /// Partition/ordering key: the subject's user id as text.
    pub fn key(&self) -> &str {
        &self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_wire_form() {
        assert_eq!(RoleName::parse("ADMIN"), Some(RoleName::Admin));
        assert_eq!(RoleName::parse("user"), Some(RoleName::User));
        assert_eq!(RoleName::parse("ROOT"), None);
        assert_eq!(RoleName::Admin.as_str(), "ADMIN");
        assert!(RoleName::Admin.can_admin());
        assert!(!RoleName::User.can_admin());
    }

    #[test]
    fn identity_event_serializes_camel_case_with_millis() {
        let mut event = IdentityEvent::bare("42", IdentityEventType::Created);
        event.username = Some("alice".to_string());
        event.first_name = Some("Alice".to_string());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["userId"], "42");
        assert_eq!(json["eventType"], "CREATED");
        assert_eq!(json["firstName"], "Alice");
        // DELETED-style absent fields are omitted entirely
        assert!(json.get("lastName").is_none());
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn deleted_event_carries_only_the_key() {
        let event = IdentityEvent::deleted("7");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "DELETED");
        assert!(json.get("username").is_none());
        assert!(json.get("email").is_none());
    }

    #[test]
    fn trusted_identity_header_pairs_cover_contract() {
        let identity = TrustedIdentity {
            user_id: "1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: RoleName::Admin,
        };
        let pairs = identity.header_pairs();
        assert_eq!(pairs[0], (HEADER_USER_ID, "1".to_string()));
        assert_eq!(pairs[1], (HEADER_USER_ROLE, "ADMIN".to_string()));
        assert_eq!(pairs[2], (HEADER_USER_EMAIL, "alice@example.com".to_string()));
        assert_eq!(pairs[3], (HEADER_USER_NAME, "alice".to_string()));
    }
}
