//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BLOSSOM_API_BASE_URL` - Base URL of the remote API (e.g.
//!   `https://shop.example.com/api/v1`)
//!
//! ## Optional
//! - `BLOSSOM_STATE_DIR` - Directory for persisted session/cart/favorites
//!   state (default: `.blossom`)
//! - `BLOSSOM_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `TELEGRAM_INIT_DATA` - Ambient host identity assertion, for runs
//!   outside the embedding shell (development, CLI)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_STATE_DIR: &str = ".blossom";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the remote API, without a trailing slash.
    pub api_base_url: String,
    /// Directory for persisted local state.
    pub state_dir: PathBuf,
    /// Transport-level request timeout.
    pub http_timeout: Duration,
    /// Ambient host identity assertion, if the environment carries one.
    pub host_init_data: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_required_env("BLOSSOM_API_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let state_dir =
            PathBuf::from(get_env_or_default("BLOSSOM_STATE_DIR", DEFAULT_STATE_DIR));
        let timeout_secs = get_env_or_default(
            "BLOSSOM_HTTP_TIMEOUT_SECS",
            &DEFAULT_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("BLOSSOM_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        let host_init_data = get_optional_env("TELEGRAM_INIT_DATA");

        Ok(Self {
            api_base_url,
            state_dir,
            http_timeout: Duration::from_secs(timeout_secs),
            host_init_data,
        })
    }

    /// Build a config directly, for tests and embedding hosts.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            state_dir: state_dir.into(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            host_init_data: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = ClientConfig::new("https://shop.example.com/api/v1/", "/tmp/state");
        assert_eq!(config.api_base_url, "https://shop.example.com/api/v1");
    }

    #[test]
    fn test_new_defaults() {
        let config = ClientConfig::new("https://shop.example.com/api/v1", ".state");
        assert_eq!(config.http_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.host_init_data.is_none());
    }
}
