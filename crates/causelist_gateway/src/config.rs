use std::env;
use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_UPSTREAM_ORIGIN: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bind address: {0}")]
    InvalidBindAddr(String),
    #[error("invalid upstream origin: {0}")]
    InvalidOrigin(String),
    #[error("http client: {0}")]
    HttpClient(String),
}

/// Gateway configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub upstream_origin: String,
}

impl GatewayConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_vars(
            env::var("CAUSELIST_GATEWAY_BIND").ok().as_deref(),
            env::var("CAUSELIST_UPSTREAM_ORIGIN").ok().as_deref(),
        )
    }

    fn from_vars(bind: Option<&str>, origin: Option<&str>) -> Result<Self, ConfigError> {
        let bind = bind.unwrap_or(DEFAULT_BIND_ADDR);
        let bind_addr = bind
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(bind.to_string()))?;
        Ok(Self {
            bind_addr,
            upstream_origin: origin.unwrap_or(DEFAULT_UPSTREAM_ORIGIN).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = GatewayConfig::from_vars(None, None).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.upstream_origin, DEFAULT_UPSTREAM_ORIGIN);
    }

    #[test]
    fn bad_bind_address_is_reported() {
        let err = GatewayConfig::from_vars(Some("not-an-addr"), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr(addr) if addr == "not-an-addr"));
    }
}
