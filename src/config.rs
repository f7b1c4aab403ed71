use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_SECTION: &str = "tm1srv01";

/// How workers share remote connections during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    /// One session, used concurrently by every worker.
    #[default]
    Shared,
    /// One session per worker.
    PerWorker,
}

/// Connection settings for one server, read from a named table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub ssl: bool,
    /// CAM namespace; switches authentication from basic to CAM.
    pub namespace: Option<String>,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default)]
    pub connection_mode: ConnectionMode,
}

fn default_true() -> bool {
    true
}

impl ServerConfig {
    /// Load the `section` table from the TOML file at `path`.
    pub fn load(path: &Path, section: &str) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Configuration(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents, section)
    }

    pub fn from_toml(contents: &str, section: &str) -> Result<Self> {
        let mut sections: HashMap<String, toml::Value> = toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("malformed config: {}", e)))?;
        let table = sections.remove(section).ok_or_else(|| {
            Error::Configuration(format!("section [{}] not found", section))
        })?;
        let config = table
            .try_into::<Self>()
            .map_err(|e| Error::Configuration(format!("section [{}]: {}", section, e)))?;
        if config.address.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "section [{}]: address is empty",
                section
            )));
        }
        Ok(config)
    }

    /// REST root for this server, e.g. `https://host:8010/api/v1`.
    pub fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}/api/v1", scheme, self.address, self.port)
    }
}
