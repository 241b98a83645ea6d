//! Gatekit Gateway
//!
//! The single entry point to a Gatekit deployment. Public auth endpoints
//! pass through untouched; everything else must carry a bearer token, which
//! the gateway validates against the authority before injecting the trusted
//! `X-User-*` headers and forwarding. Client-supplied values for those
//! headers are stripped unconditionally, so downstream trust is not
//! forgeable from outside.

pub mod allowlist;
pub mod client;
pub mod error;
pub mod proxy;

pub use allowlist::Allowlist;
pub use client::AuthorityClient;
pub use error::GatewayError;
pub use proxy::{router, GatewayState, RouteTable};
