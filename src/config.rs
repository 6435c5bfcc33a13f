//! Service configuration: optional TOML file plus environment
//! overrides. Every field has a working default, so a bare
//! `pyturbo serve` runs locally with no config at all.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "users.db".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible provider.
    pub base_url: String,
    /// Total timeout for one completion call.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    /// Load from a TOML file (when given), then apply env overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config: Self = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)?;
                toml::from_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("PYTURBO_HOST") {
            self.gateway.host = v;
        }
        if let Ok(v) = std::env::var("PYTURBO_PORT") {
            match v.parse() {
                Ok(port) => self.gateway.port = port,
                Err(e) => tracing::warn!("ignoring invalid PYTURBO_PORT: {e}"),
            }
        }
        if let Ok(v) = std::env::var("PYTURBO_DB") {
            self.database.path = v.into();
        }
        if let Ok(v) = std::env::var("PYTURBO_UPSTREAM_URL") {
            self.upstream.base_url = v;
        }
    }
}
