//! Principal Entity
//!
//! The authenticated identity record, authoritative in this service only.
//! Carries credentials and authorization data, never profile fields; those
//! travel through the event pipeline into replica stores.

use chrono::{DateTime, Utc};
use gk_common::RoleName;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// UUID, immutable once assigned
    #[serde(rename = "_id")]
    pub id: String,

    /// Globally unique login name
    pub username: String,

    /// Globally unique email address
    pub email: String,

    /// Argon2id PHC-format hash. Never leaves this service.
    pub password_hash: String,

    pub role: RoleName,

    /// Disabled principals fail gateway validation immediately, before
    /// their access tokens expire.
    pub enabled: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role: RoleName::User,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_role(mut self, role: RoleName) -> Self {
        self.role = role;
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.touch();
    }
}
