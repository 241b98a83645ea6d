//! Gatekit Configuration System
//!
//! TOML-based configuration with environment variable override support.
//! Every service reads the same `AppConfig`; each binary uses the sections
//! relevant to it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub mongodb: MongoConfig,
    pub token: TokenConfig,
    pub gateway: GatewayConfig,
    pub bus: BusConfig,

    /// Enable development mode (in-memory stores, seeded data)
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            mongodb: MongoConfig::default(),
            token: TokenConfig::default(),
            gateway: GatewayConfig::default(),
            bus: BusConfig::default(),
            dev_mode: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.access_ttl_secs <= 0 {
            return Err(ConfigError::ValidationError(
                "token.access_ttl_secs must be positive".to_string(),
            ));
        }
        if self.token.refresh_ttl_secs <= self.token.access_ttl_secs {
            return Err(ConfigError::ValidationError(
                "token.refresh_ttl_secs must exceed access_ttl_secs".to_string(),
            ));
        }
        if self.bus.partitions == 0 {
            return Err(ConfigError::ValidationError(
                "bus.partitions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["http://localhost:4200".to_string()],
        }
    }
}

/// MongoDB configuration (used when the `mongodb` backend feature is enabled)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "gatekit".to_string(),
        }
    }
}

/// Token issuance configuration for the authority
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC signing secret for access tokens. Rotating it invalidates all
    /// outstanding access tokens.
    pub secret: String,
    pub issuer: String,
    /// Access token lifetime in seconds
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "gatekit".to_string(),
            access_ttl_secs: 900,           // 15 minutes
            refresh_ttl_secs: 86400 * 7,    // 7 days
        }
    }
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the authority service
    pub authority_url: String,
    /// Timeout for the validate call; exceeding it is a validation failure
    pub validate_timeout_ms: u64,
    /// Path prefixes forwarded without validation (login/register/refresh)
    pub public_paths: Vec<String>,
    /// Downstream routing rules, longest prefix wins
    pub routes: Vec<RouteRule>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            authority_url: "http://localhost:8081".to_string(),
            validate_timeout_ms: 3000,
            public_paths: vec![
                "/api/auth/v1/register".to_string(),
                "/api/auth/v1/login".to_string(),
                "/api/auth/v1/refresh".to_string(),
            ],
            routes: vec![
                RouteRule {
                    prefix: "/api/auth".to_string(),
                    target: "http://localhost:8081".to_string(),
                },
                RouteRule {
                    prefix: "/api/users".to_string(),
                    target: "http://localhost:8082".to_string(),
                },
            ],
        }
    }
}

/// Maps a path prefix to a downstream base URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    pub prefix: String,
    pub target: String,
}

/// Event bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Number of partitions for the in-process bus; same-key events always
    /// land on the same partition.
    pub partitions: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { partitions: 4 }
    }
}
