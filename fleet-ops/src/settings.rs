//! Layered operator settings
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A YAML/TOML settings file (`fleetsync.*` in the working directory
//!    unless `--config` names one)
//! 3. `FLEET__*` environment variables, `__` separating nested keys
//!    (`FLEET__SYNC__QUEUE_RETENTION=retain_failed`)

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use fleet_sync::{HttpRemoteConfig, LocalDbConfig, SyncConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_PREFIX: &str = "FLEET";
pub const DEFAULT_CONFIG_NAME: &str = "fleetsync";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub local_db: LocalDbConfig,
    pub sync: SyncConfig,
    pub remote: HttpRemoteConfig,
}

impl Settings {
    /// Load settings from the file (if any) and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let file = match path {
            // An explicitly named file must exist
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")?;

        tracing::debug!(
            db_path = %settings.local_db.db_path,
            base_url = %settings.remote.base_url,
            retention = ?settings.sync.queue_retention,
            "Settings loaded"
        );

        Ok(settings)
    }
}
