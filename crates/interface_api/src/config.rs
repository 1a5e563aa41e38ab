//! API configuration

use serde::Deserialize;

use core_kernel::{TemporalError, Timezone};

/// API configuration
///
/// Every field falls back to its default when the matching `API_*`
/// environment variable is absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// HS256 secret for bearer tokens
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Upper bound on pooled database connections
    pub database_max_connections: u32,
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: String,
    /// Deployment environment; `production` hides internal error messages
    pub environment: String,
    /// IANA name of the hospital's timezone, used to compute "today"
    pub timezone: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/hospital".to_string(),
            database_max_connections: 10,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            environment: "development".to_string(),
            timezone: "Africa/Lagos".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    /// Parses the configured timezone
    pub fn timezone(&self) -> Result<Timezone, TemporalError> {
        Timezone::parse(&self.timezone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert!(!config.is_production());
        assert!(!config.json_logs());
        assert_eq!(config.timezone().unwrap(), Timezone::default());
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let config = ApiConfig {
            timezone: "Mars/Olympus".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.timezone().is_err());
    }
}
