//! Configuration management for localdock
//!
//! Settings are loaded from environment variables with sensible defaults.
//! Configuration covers the emulator endpoint, the region used in request
//! signing placeholders, timeouts, and logging.
//!
//! # Environment Variables
//!
//! - `LOCALDOCK_ENDPOINT`: Emulator base URL. Falls back to `AWS_ENDPOINT_URL`,
//!   then to "http://localhost:4566"
//! - `LOCALDOCK_REGION`: Region used for request routing. Falls back to
//!   `AWS_DEFAULT_REGION`, then to "us-east-1"
//! - `LOCALDOCK_REQUEST_TIMEOUT`: Timeout in seconds for emulator calls - default: "30"
//! - `LOCALDOCK_CONNECT_TIMEOUT`: Timeout in seconds for the connectivity check - default: "5"
//! - `LOCALDOCK_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use localdock::LocaldockConfig;
//!
//! let config = LocaldockConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default values for configuration
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4566";
pub const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Main configuration structure for localdock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaldockConfig {
    /// Emulator base URL, without trailing slash
    pub endpoint: String,

    /// Region placed in the credential scope of every request
    pub region: String,

    /// Timeout for ordinary emulator calls in seconds
    pub request_timeout_secs: u64,

    /// Timeout for the connectivity check in seconds
    pub connect_timeout_secs: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for LocaldockConfig {
    /// Creates a new configuration by loading from environment variables with defaults
    fn default() -> Self {
        let endpoint = env::var("LOCALDOCK_ENDPOINT")
            .or_else(|_| env::var("AWS_ENDPOINT_URL"))
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let region = env::var("LOCALDOCK_REGION")
            .or_else(|_| env::var("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|_| DEFAULT_REGION.to_string());

        let request_timeout_secs = env::var("LOCALDOCK_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let connect_timeout_secs = env::var("LOCALDOCK_CONNECT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        let log_level = env::var("LOCALDOCK_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            endpoint,
            region,
            request_timeout_secs,
            connect_timeout_secs,
            log_level,
        }
    }
}

impl LocaldockConfig {
    /// Returns a copy of this configuration pointing at another endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any validation fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::ValidationFailed(format!(
                "Endpoint must start with http:// or https://, got: {}",
                self.endpoint
            )));
        }

        if reqwest::Url::parse(&self.endpoint).is_err() {
            return Err(ConfigError::ParseError {
                field: "endpoint".to_string(),
                error: format!("not a valid URL: {}", self.endpoint),
            });
        }

        if self.region.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Region must not be empty".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 60 {
            return Err(ConfigError::ValidationFailed(
                "Connect timeout must be between 1 and 60 seconds".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("endpoint".to_string(), self.endpoint.clone());
        map.insert("region".to_string(), self.region.clone());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert(
            "connect_timeout_secs".to_string(),
            self.connect_timeout_secs.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for LocaldockConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Localdock Configuration:")?;
        writeln!(f, "  Endpoint: {}", self.endpoint)?;
        writeln!(f, "  Region: {}", self.region)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Connect Timeout: {}s", self.connect_timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
