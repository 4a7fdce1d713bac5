use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::controller::DEFAULT_POLL_INTERVAL;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:3000/proxy";
pub const DEFAULT_TOKEN_FILE: &str = ".causelist_session.ron";

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Where API paths are appended: the gateway's `/proxy` prefix or the upstream origin.
    pub api_base: String,
    pub token_file: PathBuf,
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_vars(
            env::var("CAUSELIST_API_BASE").ok(),
            env::var("CAUSELIST_TOKEN_FILE").ok(),
            env::var("CAUSELIST_POLL_INTERVAL_MS").ok(),
        )
    }

    fn from_vars(
        api_base: Option<String>,
        token_file: Option<String>,
        poll_interval_ms: Option<String>,
    ) -> Result<Self> {
        let poll_interval = match poll_interval_ms {
            Some(raw) => {
                let ms: u64 = raw
                    .trim()
                    .parse()
                    .context("CAUSELIST_POLL_INTERVAL_MS must be a number of milliseconds")?;
                anyhow::ensure!(ms > 0, "CAUSELIST_POLL_INTERVAL_MS must be positive");
                Duration::from_millis(ms)
            }
            None => DEFAULT_POLL_INTERVAL,
        };
        Ok(Self {
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            token_file: PathBuf::from(token_file.unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string())),
            poll_interval,
        })
    }
}
