//! MongoDB backends for principal and refresh token storage.
//!
//! Uniqueness of username and email is backed by unique indexes created at
//! startup (`ensure_indexes`); the pre-insert lookups exist to map the
//! violation to a specific duplicate error instead of a raw driver error.

use async_trait::async_trait;
use chrono::Duration;
use mongodb::{bson::doc, options::IndexOptions, Collection, Database, IndexModel};

use crate::error::{AuthorityError, Result};
use crate::principal::Principal;
use crate::refresh::{RefreshToken, RefreshTokenStore};
use crate::store::PrincipalStore;

pub struct MongoPrincipalStore {
    collection: Collection<Principal>,
}

impl MongoPrincipalStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("principals"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique = |field: &str| {
            IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };
        self.collection
            .create_indexes([unique("username"), unique("email")])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PrincipalStore for MongoPrincipalStore {
    async fn insert(&self, principal: Principal) -> Result<Principal> {
        if self.find_by_username(&principal.username).await?.is_some() {
            return Err(AuthorityError::DuplicateUsername {
                username: principal.username,
            });
        }
        if self.find_by_email(&principal.email).await?.is_some() {
            return Err(AuthorityError::DuplicateEmail {
                email: principal.email,
            });
        }
        self.collection.insert_one(&principal).await?;
        Ok(principal)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>> {
        Ok(self
            .collection
            .find_one(doc! { "username": username })
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn update(&self, principal: Principal) -> Result<Principal> {
        let result = self
            .collection
            .replace_one(doc! { "_id": &principal.id }, &principal)
            .await?;
        if result.matched_count == 0 {
            return Err(AuthorityError::PrincipalNotFound {
                id: principal.id.clone(),
            });
        }
        Ok(principal)
    }
}

/// Refresh token store keyed by principal id: one document per principal,
/// replaced wholesale on every issue.
pub struct MongoRefreshTokenStore {
    collection: Collection<RefreshToken>,
}

impl MongoRefreshTokenStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("refresh_tokens"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique_principal = IndexModel::builder()
            .keys(doc! { "principalId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let token_lookup = IndexModel::builder().keys(doc! { "token": 1 }).build();
        self.collection
            .create_indexes([unique_principal, token_lookup])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for MongoRefreshTokenStore {
    async fn issue(&self, principal_id: &str, ttl: Duration) -> Result<RefreshToken> {
        let fresh = RefreshToken::generate(principal_id, ttl);

        // Single upsert keyed by principalId: the replace IS the revocation
        // of any previous token.
        self.collection
            .find_one_and_replace(doc! { "principalId": principal_id }, &fresh)
            .upsert(true)
            .await?;

        Ok(fresh)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        // Expiry is evaluated in Rust, not in the query, because timestamps
        // are stored as RFC 3339 strings.
        Ok(self.collection.find_one(doc! { "token": token }).await?)
    }
}
