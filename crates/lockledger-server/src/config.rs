use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use chrono::Duration;
use lockledger_core::LedgerConfig;
use lockledger_types::{validate_container_name, GRACE_WINDOW_SECS};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const ENV_BIND_ADDR: &str = "LOCKLEDGER_BIND_ADDR";
pub const ENV_GRACE_WINDOW_SECS: &str = "LOCKLEDGER_GRACE_WINDOW_SECS";

const MAX_GRACE_WINDOW_SECS: u64 = 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
    pub grace_window_secs: u64,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// JSON seed file for the in-memory store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<PathBuf>,
    /// Containers whose ledger hold is checked and restored at startup.
    pub containers: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            allowed_origins: vec!["http://localhost:5173".into()],
            grace_window_secs: GRACE_WINDOW_SECS as u64,
            default_page_size: 5,
            max_page_size: 100,
            seed: None,
            containers: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Read a TOML file, apply environment overrides, and validate.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> ServerResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn apply_env_overrides(&mut self) -> ServerResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ServerResult<()> {
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.bind_addr = addr
                .parse()
                .map_err(|e| ServerError::Config(format!("{ENV_BIND_ADDR}={addr}: {e}")))?;
        }
        if let Some(secs) = lookup(ENV_GRACE_WINDOW_SECS) {
            self.grace_window_secs = secs
                .parse()
                .map_err(|e| ServerError::Config(format!("{ENV_GRACE_WINDOW_SECS}={secs}: {e}")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.grace_window_secs > MAX_GRACE_WINDOW_SECS {
            return Err(ServerError::Config(format!(
                "grace_window_secs must be at most {MAX_GRACE_WINDOW_SECS}"
            )));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ServerError::Config(
                "default_page_size must be between 1 and max_page_size".into(),
            ));
        }
        for origin in &self.allowed_origins {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| ServerError::Config(format!("invalid CORS origin: {origin}")))?;
        }
        for container in &self.containers {
            validate_container_name(container).map_err(|e| ServerError::Config(e.to_string()))?;
        }
        Ok(())
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        let secs = self.grace_window_secs.min(MAX_GRACE_WINDOW_SECS) as i64;
        LedgerConfig::with_grace_window(Duration::seconds(secs))
    }
}
