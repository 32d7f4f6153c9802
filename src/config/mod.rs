mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, path::Path};
use tracing::debug;

/// Loads the configuration: built-in defaults, then the YAML file at
/// `CONFIG_PATH` (or `config.yaml`) if it exists, then environment variables.
pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    load_file(Path::new(&config_path))
        .await?
        .with_overrides(|key| env::var(key).ok())
}

/// Reads a YAML configuration file, falling back to defaults when it does
/// not exist.
pub async fn load_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("No configuration file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    debug!("Loading configuration from: {}", path.display());
    let config_str = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&config_str)?;

    Ok(config)
}

impl Config {
    /// Applies `MODEL_NAME`, `TASK`, `HOST`, `PORT`, `ENVIRONMENT` and
    /// `LOG_LEVEL` from `lookup` on top of the current values.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("MODEL_NAME") {
            self.model.name = name;
        }
        if let Some(task) = lookup("TASK") {
            self.model.task = task;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("Invalid PORT value: '{}'", port)))?;
        }
        if let Some(environment) = lookup("ENVIRONMENT") {
            self.server.environment = environment;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.server.logs.level = level;
        }

        Ok(self)
    }
}
