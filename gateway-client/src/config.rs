//! Configuration for the gateway

use serde::{Deserialize, Serialize};

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Rewrite every dial address to loopback, keeping the registered
    /// port. TLS server-name verification still uses the registered host.
    /// Supports local multi-node topologies reached through per-port
    /// loopback forwarding.
    pub as_localhost: bool,

    /// Structurally validate trust-root PEM bytes at registration.
    /// Disable to accept trust material unchecked, matching deployments
    /// that validate at a higher layer.
    pub validate_trust_roots: bool,

    /// Default per-call timeout (milliseconds) applied when a call
    /// supplies no explicit deadline. Zero means no deadline.
    pub default_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            as_localhost: false,
            validate_trust_roots: true,
            default_timeout_ms: 0,
        }
    }
}

impl GatewayConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;
        let config: GatewayConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = GatewayConfig::default();

        if let Ok(value) = std::env::var("GATEWAY_AS_LOCALHOST") {
            config.as_localhost = parse_bool(&value);
        }

        if let Ok(value) = std::env::var("GATEWAY_VALIDATE_TRUST_ROOTS") {
            config.validate_trust_roots = parse_bool(&value);
        }

        if let Ok(value) = std::env::var("GATEWAY_DEFAULT_TIMEOUT_MS") {
            config.default_timeout_ms = value
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid timeout: {}", e)))?;
        }

        Ok(config)
    }

    /// Default call deadline, if configured
    pub fn default_timeout(&self) -> Option<std::time::Duration> {
        if self.default_timeout_ms == 0 {
            None
        } else {
            Some(std::time::Duration::from_millis(self.default_timeout_ms))
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1")
}
