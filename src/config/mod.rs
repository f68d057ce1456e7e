mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, path::Path};
use tracing::debug;

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    load_from(config_path).await
}

pub async fn load_from(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    debug!("Loading configuration from: {}", path.display());

    let config_str = tokio::fs::read_to_string(path).await?;
    from_yaml_str(&config_str)
}

pub fn from_yaml_str(text: &str) -> Result<Config> {
    // An empty document deserializes to unit, not to an all-defaults struct.
    if text.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_yaml::from_str(text)?;
    if config.agent.ask_timeout_ms == 0 {
        return Err(Error::config("agent.ask_timeout_ms must be greater than zero"));
    }

    Ok(config)
}
