//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "gatekit.toml",
    "./config/gatekit.toml",
    "/etc/gatekit/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("GATEKIT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    fn apply_env_overrides(&self, config: &mut AppConfig) {
        // HTTP
        if let Ok(val) = env::var("GATEKIT_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.http.port = port;
            }
        }
        if let Ok(val) = env::var("GATEKIT_HTTP_HOST") {
            config.http.host = val;
        }
        if let Ok(val) = env::var("GATEKIT_CORS_ORIGINS") {
            config.http.cors_origins = val.split(',').map(|s| s.trim().to_string()).collect();
        }

        // MongoDB
        if let Ok(val) = env::var("GATEKIT_MONGODB_URI") {
            config.mongodb.uri = val;
        }
        if let Ok(val) = env::var("GATEKIT_MONGODB_DATABASE") {
            config.mongodb.database = val;
        }

        // Tokens
        if let Ok(val) = env::var("GATEKIT_TOKEN_SECRET") {
            config.token.secret = val;
        }
        if let Ok(val) = env::var("GATEKIT_TOKEN_ISSUER") {
            config.token.issuer = val;
        }
        if let Ok(val) = env::var("GATEKIT_ACCESS_TTL_SECS") {
            if let Ok(ttl) = val.parse() {
                config.token.access_ttl_secs = ttl;
            }
        }
        if let Ok(val) = env::var("GATEKIT_REFRESH_TTL_SECS") {
            if let Ok(ttl) = val.parse() {
                config.token.refresh_ttl_secs = ttl;
            }
        }

        // Gateway
        if let Ok(val) = env::var("GATEKIT_AUTHORITY_URL") {
            config.gateway.authority_url = val;
        }
        if let Ok(val) = env::var("GATEKIT_VALIDATE_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                config.gateway.validate_timeout_ms = ms;
            }
        }

        // Bus
        if let Ok(val) = env::var("GATEKIT_BUS_PARTITIONS") {
            if let Ok(partitions) = val.parse() {
                config.bus.partitions = partitions;
            }
        }

        // Dev mode
        if let Ok(val) = env::var("GATEKIT_DEV_MODE") {
            config.dev_mode = val == "true" || val == "1";
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
