//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;

/// Default route prefix.
pub const DEFAULT_PREFIX: &str = "/api/v1";

/// Default request body limit (8 MiB), bounding the binary write path.
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid prefix {0:?}: must start with '/' and not end with one")]
    InvalidPrefix(String),

    #[error("max_body_bytes cannot be 0")]
    InvalidBodyLimit,
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address.
    pub host: IpAddr,
    /// Listen port. 0 binds an ephemeral port.
    pub port: u16,
    /// Route prefix for every endpoint.
    pub prefix: String,
    /// Request body limit in bytes.
    pub max_body_bytes: usize,
    /// CORS configuration.
    pub cors: CorsConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            prefix: DEFAULT_PREFIX.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            cors: CorsConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.prefix.starts_with('/') || self.prefix.ends_with('/') {
            return Err(ConfigError::InvalidPrefix(self.prefix.clone()));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::InvalidBodyLimit);
        }
        Ok(())
    }

    /// Server bind address.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GatewayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_prefix_rejected() {
        let config = GatewayConfig {
            prefix: "api/v1".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GatewayConfig {
            prefix: "/api/".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_body_limit_rejected() {
        let config = GatewayConfig {
            max_body_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
