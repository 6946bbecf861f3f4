use super::schema::FieldmarkConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

const LOCAL_CONFIG: &str = "./fieldmark.yaml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Files to try, most specific first: an explicit `--config` path,
    /// `./fieldmark.yaml`, then `~/.fieldmark/config.yaml`. An explicit path
    /// replaces the other two.
    pub fn candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
        if let Some(path) = explicit {
            return vec![expand_home(path)];
        }
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".fieldmark").join("config.yaml"));
        }
        paths
    }

    /// Loads the first candidate that exists, or the defaults when none
    /// does. An explicit path must be readable.
    pub async fn load(explicit: Option<&Path>) -> Result<FieldmarkConfig, ConfigError> {
        for path in Self::candidates(explicit) {
            if explicit.is_some() || tokio::fs::try_exists(&path).await? {
                return Self::load_from(&path).await;
            }
        }
        debug!("No config file found, using defaults");
        Ok(FieldmarkConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<FieldmarkConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: FieldmarkConfig = serde_yaml::from_str(&content)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Store file from the config, falling back to `~/.fieldmark/store.json`.
    pub fn store_path(config: &FieldmarkConfig) -> PathBuf {
        match &config.store.path {
            Some(path) => expand_home(path),
            None => default_store_path(),
        }
    }
}

pub fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fieldmark")
        .join("store.json")
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        Err(_) => path.to_path_buf(),
    }
}
