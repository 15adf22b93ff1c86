// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON).
///
/// A missing file is not an error: the service runs on defaults so it can be
/// dropped onto a host with nothing but environment variables.
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let mut config = if tokio::fs::try_exists(path).await.unwrap_or(false) {
        let contents = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        parse_config(path, &contents)?
    } else {
        tracing::info!("No config file at {}, using defaults", path.display());
        Config::default()
    };

    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn parse_config(path: &Path, contents: &str) -> Result<Config> {
    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        }
        _ => serde_json::from_str(contents).context("Failed to parse JSON config")?,
    };
    Ok(config)
}
