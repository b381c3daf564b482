//! API server configuration.
//!
//! Settings are layered, later sources winning:
//! 1. Built-in defaults
//! 2. `shelfwise.toml` in the working directory, or the file named by
//!    `SHELFWISE_CONFIG` (optional)
//! 3. `SHELFWISE_*` environment variables, e.g. `SHELFWISE_PORT=9000`

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;

/// Default config file, looked up relative to the working directory.
const DEFAULT_CONFIG_FILE: &str = "shelfwise.toml";

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub max_connections: u32,

    /// Fallback tracing filter when `RUST_LOG` is unset
    pub log_filter: String,

    /// Page size for list endpoints when the request gives none
    pub default_page_size: i64,

    /// Largest page a list endpoint returns
    pub max_page_size: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: "./shelfwise.db".to_string(),
            max_connections: 5,
            log_filter: "info,sqlx=warn".to_string(),
            default_page_size: 50,
            max_page_size: 200,
        }
    }
}

impl ApiConfig {
    /// Load configuration from defaults, the optional config file and
    /// the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("SHELFWISE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(&path, Environment::with_prefix("SHELFWISE"))
    }

    fn from_sources(path: &str, environment: Environment) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let config: ApiConfig = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port)?
            .set_default("database_path", defaults.database_path)?
            .set_default("max_connections", defaults.max_connections)?
            .set_default("log_filter", defaults.log_filter)?
            .set_default("default_page_size", defaults.default_page_size)?
            .set_default("max_page_size", defaults.max_page_size)?
            .add_source(File::with_name(path).required(false))
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue("port".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database_path".to_string()));
        }
        if self.default_page_size < 1 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::InvalidValue("default_page_size".to_string()));
        }
        Ok(())
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("host".to_string()))
    }

    /// Resolves a requested page size against the configured limits.
    pub fn page_size(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_with(pairs: &[(&str, &str)]) -> Environment {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("SHELFWISE").source(Some(vars))
    }

    #[test]
    fn test_defaults_without_file() {
        let config = ApiConfig::from_sources("does-not-exist.toml", env_with(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_filter, "info,sqlx=warn");
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_environment_overrides() {
        let config = ApiConfig::from_sources(
            "does-not-exist.toml",
            env_with(&[("SHELFWISE_PORT", "9000"), ("SHELFWISE_DATABASE_PATH", "/tmp/x.db")]),
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_path, "/tmp/x.db");
    }

    #[test]
    fn test_validation() {
        let mut config = ApiConfig::default();
        assert!(config.validate().is_ok());

        config.port = 0;
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.default_page_size = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_page_size_clamped() {
        let config = ApiConfig::default();
        assert_eq!(config.page_size(None), 50);
        assert_eq!(config.page_size(Some(10)), 10);
        assert_eq!(config.page_size(Some(10_000)), 200);
        assert_eq!(config.page_size(Some(0)), 1);
    }
}
