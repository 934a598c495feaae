//! Billing API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. A `.env` file, when present, is read by `main` before this
//! runs. Database settings (`DB_*`) are loaded separately by
//! [`billing_db::DbConfig::from_env`].

use std::env;
use std::net::{IpAddr, SocketAddr};

/// Deployment environment. Production hides error detail from responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => AppEnv::Production,
            _ => AppEnv::Development,
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind (default: 0.0.0.0)
    pub host: IpAddr,

    /// HTTP port (default: 5000)
    pub port: u16,

    /// `APP_ENV` (default: development)
    pub environment: AppEnv,

    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 5000,
            environment: AppEnv::Development,
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let host = match lookup("HOST").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HOST".to_string()))?,
            None => defaults.host,
        };

        let port = match lookup("PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
            None => defaults.port,
        };

        let environment = lookup("APP_ENV")
            .map(|raw| AppEnv::parse(&raw))
            .unwrap_or(defaults.environment);

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(ApiConfig {
            host,
            port,
            environment,
            cors_origins,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == AppEnv::Production
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid CORS origin: {0}")]
    InvalidOrigin(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:5000");
        assert!(!config.is_production());
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("APP_ENV", "Production"),
            ("CORS_ORIGINS", "http://pos.local, ,http://localhost:3000"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:8080");
        assert!(config.is_production());
        assert_eq!(
            config.cors_origins,
            vec!["http://pos.local", "http://localhost:3000"]
        );
    }

    #[test]
    fn test_invalid_port() {
        let err = ApiConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
