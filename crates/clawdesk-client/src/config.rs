//! Gateway client configuration.
//!
//! Every [`GatewayClient`](crate::GatewayClient) is built from an explicit
//! [`ClientConfig`]. The [`Default`] impl only spells out the stock values:
//! - endpoint `ws://localhost:18789`
//! - 30 s per-request timeout, 10 s connect timeout
//! - 5 reconnection attempts starting at 1 s

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::GatewayError;
use crate::reconnect::ReconnectConfig;

/// Default gateway endpoint.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:18789";

/// Configuration for a gateway client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Gateway WebSocket URL.
    pub endpoint: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Timeout for establishing the transport, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Maximum number of requests in flight at once.
    pub max_in_flight: usize,
    /// Reconnection policy.
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            max_in_flight: 256,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given endpoint with stock settings.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the number of automatic reconnection attempts.
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect.max_attempts = attempts;
        self
    }

    /// Set the delay before the first reconnection attempt.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect.base_delay_ms = duration_ms(delay);
        self
    }

    /// Set the in-flight request cap.
    #[must_use]
    pub const fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, GatewayError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| GatewayError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.endpoint.is_empty() {
            return Err(GatewayError::Config("endpoint cannot be empty".to_string()));
        }

        let url = Url::parse(&self.endpoint)
            .map_err(|e| GatewayError::Config(format!("invalid endpoint '{}': {e}", self.endpoint)))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(GatewayError::Config(
                "endpoint must start with ws:// or wss://".to_string(),
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err(GatewayError::Config(
                "request_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout_ms == 0 {
            return Err(GatewayError::Config(
                "connect_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_in_flight == 0 {
            return Err(GatewayError::Config(
                "max_in_flight must be greater than 0".to_string(),
            ));
        }

        if self.reconnect.base_delay_ms == 0 {
            return Err(GatewayError::Config(
                "reconnect.base_delay_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("failed to write temp file");
        file
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, "ws://localhost:18789");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.base_delay(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("wss://assistant.local:9000")
            .with_request_timeout(Duration::from_millis(1500))
            .with_connect_timeout(Duration::from_secs(2))
            .with_max_reconnect_attempts(3)
            .with_base_delay(Duration::from_millis(250))
            .with_max_in_flight(8);

        assert_eq!(config.endpoint, "wss://assistant.local:9000");
        assert_eq!(config.request_timeout_ms, 1500);
        assert_eq!(config.connect_timeout_ms, 2000);
        assert_eq!(config.reconnect.max_attempts, 3);
        assert_eq!(config.reconnect.base_delay_ms, 250);
        assert_eq!(config.max_in_flight, 8);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = ClientConfig::from_toml(r#"endpoint = "ws://127.0.0.1:18789""#)
            .expect("should parse minimal config");
        assert_eq!(config.endpoint, "ws://127.0.0.1:18789");
        assert_eq!(config.request_timeout_ms, 30_000);
        assert_eq!(config.reconnect, ReconnectConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            endpoint = "wss://gateway.example.com"
            request_timeout_ms = 5000
            connect_timeout_ms = 2000
            max_in_flight = 16

            [reconnect]
            base_delay_ms = 500
            max_attempts = 8
        "#;

        let config = ClientConfig::from_toml(toml).expect("should parse full config");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_in_flight, 16);
        assert_eq!(config.reconnect.base_delay_ms, 500);
        assert_eq!(config.reconnect.max_attempts, 8);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ClientConfig::from_toml("").expect("defaults are valid");
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = ClientConfig::from_toml("endpoint = ").unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test_case("", "cannot be empty" ; "empty endpoint")]
    #[test_case("http://localhost:18789", "ws:// or wss://" ; "http scheme")]
    #[test_case("localhost:18789", "ws:// or wss://" ; "missing scheme")]
    #[test_case("not a url", "invalid endpoint" ; "garbage")]
    fn test_invalid_endpoint(endpoint: &str, message: &str) {
        let err = ClientConfig::new(endpoint).validate().unwrap_err();
        assert!(
            err.to_string().contains(message),
            "expected '{message}' in '{err}'"
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ClientConfig::default().with_request_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_base_delay_rejected() {
        let config = ClientConfig::default().with_base_delay(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_reconnect_attempts_allowed() {
        let config = ClientConfig::default().with_max_reconnect_attempts(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let file = create_temp_config("endpoint = \"ws://10.0.0.2:18789\"\nrequest_timeout_ms = 1000\n");
        let config = ClientConfig::from_file(file.path()).expect("should load config file");
        assert_eq!(config.endpoint, "ws://10.0.0.2:18789");
        assert_eq!(config.request_timeout_ms, 1000);
    }

    #[test]
    fn test_from_missing_file() {
        let err = ClientConfig::from_file("/nonexistent/clawdesk.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
