use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::Deserialize;

use crate::metadata::{DEFAULT_BASE_URL, Strategy};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_lang: Option<String>,
    pub default_format: Option<String>,
    pub strategy: Option<Strategy>,
    pub user_agent: Option<String>,
    pub base_url: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytcap/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytcap")
        .join("config.toml")
}
