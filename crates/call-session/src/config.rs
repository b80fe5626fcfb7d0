//! Call-session configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults. The reconnect policy knobs are deliberate product
//! decisions (two attempts, fixed 3000 ms delay) rather than tunables
//! most deployments should touch.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default token endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "http://localhost:8080/video/token";

/// Default room-status endpoint (pre-join checks, not the hot call path).
pub const DEFAULT_ROOM_STATUS_ENDPOINT: &str = "http://localhost:8080/video/room-status";

/// Default token fetch timeout in seconds.
pub const DEFAULT_TOKEN_TIMEOUT_SECONDS: u64 = 10;

/// Default maximum automatic reconnect attempts per session.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 2;

/// Default delay before a scheduled reconnect, in milliseconds.
///
/// Fixed rather than exponential: a call session is short-lived and
/// user-attended, so a predictable short wait beats a growing one.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// Call-session configuration.
#[derive(Debug, Clone)]
pub struct CallConfig {
    /// Token endpoint URL.
    pub token_endpoint: String,

    /// Room-status endpoint URL.
    pub room_status_endpoint: String,

    /// Timeout for a single token fetch.
    pub token_timeout: Duration,

    /// Maximum automatic reconnect attempts per session.
    pub max_reconnect_attempts: u32,

    /// Delay before a scheduled reconnect.
    pub reconnect_delay: Duration,

    /// Whether to ask the transport engine for network quality reporting.
    pub quality_reporting: bool,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            room_status_endpoint: DEFAULT_ROOM_STATUS_ENDPOINT.to_string(),
            token_timeout: Duration::from_secs(DEFAULT_TOKEN_TIMEOUT_SECONDS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            quality_reporting: true,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl CallConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let token_endpoint = vars
            .get("CALL_TOKEN_ENDPOINT")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_string());

        let room_status_endpoint = vars
            .get("CALL_ROOM_STATUS_ENDPOINT")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ROOM_STATUS_ENDPOINT.to_string());

        let token_timeout_seconds = parse_var(
            vars,
            "CALL_TOKEN_TIMEOUT_SECONDS",
            DEFAULT_TOKEN_TIMEOUT_SECONDS,
        )?;

        let max_reconnect_attempts = parse_var(
            vars,
            "CALL_MAX_RECONNECT_ATTEMPTS",
            DEFAULT_MAX_RECONNECT_ATTEMPTS,
        )?;

        let reconnect_delay_ms =
            parse_var(vars, "CALL_RECONNECT_DELAY_MS", DEFAULT_RECONNECT_DELAY_MS)?;

        let quality_reporting = parse_var(vars, "CALL_QUALITY_REPORTING", true)?;

        Ok(CallConfig {
            token_endpoint,
            room_status_endpoint,
            token_timeout: Duration::from_secs(token_timeout_seconds),
            max_reconnect_attempts,
            reconnect_delay: Duration::from_millis(reconnect_delay_ms),
            quality_reporting,
        })
    }
}

/// Parse an optional environment variable, rejecting malformed values
/// instead of silently falling back to the default.
fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{name}={raw}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_defaults() {
        let config = CallConfig::from_vars(&HashMap::new()).expect("defaults should load");

        assert_eq!(config.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
        assert_eq!(config.room_status_endpoint, DEFAULT_ROOM_STATUS_ENDPOINT);
        assert_eq!(
            config.token_timeout,
            Duration::from_secs(DEFAULT_TOKEN_TIMEOUT_SECONDS)
        );
        assert_eq!(config.max_reconnect_attempts, DEFAULT_MAX_RECONNECT_ATTEMPTS);
        assert_eq!(
            config.reconnect_delay,
            Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS)
        );
        assert!(config.quality_reporting);
    }

    #[test]
    fn test_from_vars_custom_values() {
        let vars = HashMap::from([
            (
                "CALL_TOKEN_ENDPOINT".to_string(),
                "https://api.example.com/video/token".to_string(),
            ),
            (
                "CALL_ROOM_STATUS_ENDPOINT".to_string(),
                "https://api.example.com/video/room-status".to_string(),
            ),
            ("CALL_TOKEN_TIMEOUT_SECONDS".to_string(), "5".to_string()),
            ("CALL_MAX_RECONNECT_ATTEMPTS".to_string(), "4".to_string()),
            ("CALL_RECONNECT_DELAY_MS".to_string(), "1500".to_string()),
            ("CALL_QUALITY_REPORTING".to_string(), "false".to_string()),
        ]);

        let config = CallConfig::from_vars(&vars).expect("custom values should load");

        assert_eq!(config.token_endpoint, "https://api.example.com/video/token");
        assert_eq!(
            config.room_status_endpoint,
            "https://api.example.com/video/room-status"
        );
        assert_eq!(config.token_timeout, Duration::from_secs(5));
        assert_eq!(config.max_reconnect_attempts, 4);
        assert_eq!(config.reconnect_delay, Duration::from_millis(1500));
        assert!(!config.quality_reporting);
    }

    #[test]
    fn test_from_vars_rejects_malformed_numbers() {
        let vars = HashMap::from([(
            "CALL_MAX_RECONNECT_ATTEMPTS".to_string(),
            "many".to_string(),
        )]);

        let result = CallConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_default_matches_from_vars_defaults() {
        let from_default = CallConfig::default();
        let from_vars = CallConfig::from_vars(&HashMap::new()).unwrap();

        assert_eq!(from_default.token_endpoint, from_vars.token_endpoint);
        assert_eq!(from_default.token_timeout, from_vars.token_timeout);
        assert_eq!(
            from_default.max_reconnect_attempts,
            from_vars.max_reconnect_attempts
        );
        assert_eq!(from_default.reconnect_delay, from_vars.reconnect_delay);
    }
}
