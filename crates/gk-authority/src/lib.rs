//! Gatekit Authority
//!
//! The single source of truth for credentials and identity. Issues and
//! validates bearer tokens, owns the Principal and RefreshToken records, and
//! emits identity events for profile replication. Downstream services never
//! see a password hash; profile fields pass through registration straight
//! into the event pipeline and are stored only by replicas.

pub mod api;
pub mod error;
pub mod password;
pub mod principal;
pub mod refresh;
pub mod service;
pub mod store;
pub mod token;

pub use error::{AuthorityError, Result};
pub use password::PasswordService;
pub use principal::Principal;
pub use refresh::{MemoryRefreshTokenStore, RefreshToken, RefreshTokenStore};
pub use service::{AuthTokens, AuthorityService, ProfileFields, RegisterRequest, UserSummary};
pub use store::{MemoryPrincipalStore, PrincipalStore};
pub use token::{AccessTokenClaims, IssuedToken, TokenCodec, TokenError};

#[cfg(feature = "mongodb")]
pub use store::mongo::{MongoPrincipalStore, MongoRefreshTokenStore};
