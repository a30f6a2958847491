//! HTTP Server Configuration
//!
//! Host, port, CORS, and the long-poll bound for the fact log server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Seconds a long-poll read may park before answering 204.
    /// Absent means a poll parks until the next fact arrives.
    #[serde(default)]
    pub long_poll_timeout_secs: Option<u64>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            long_poll_timeout_secs: None,
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The long-poll bound as a duration, if one is configured.
    pub fn long_poll_timeout(&self) -> Option<Duration> {
        self.long_poll_timeout_secs.map(Duration::from_secs)
    }

    /// Reject values that cannot serve.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("http.host must not be empty".to_string());
        }
        if self.long_poll_timeout_secs == Some(0) {
            return Err("http.long_poll_timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.long_poll_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = HttpServerConfig::with_port(8080);
        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_long_poll_bound() {
        let config = HttpServerConfig {
            long_poll_timeout_secs: Some(25),
            ..Default::default()
        };
        assert_eq!(config.long_poll_timeout(), Some(Duration::from_secs(25)));

        let zero = HttpServerConfig {
            long_poll_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: HttpServerConfig = serde_json::from_str("{\"port\": 9000}").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.long_poll_timeout_secs, None);
    }
}
