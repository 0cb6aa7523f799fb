use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::api::query::DEFAULT_TOP_K;
use crate::api::session::DEFAULT_SESSION_TOP_K;
use crate::api::DEFAULT_API_URL;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_session_top_k")]
    pub session_top_k: u32,
}

fn default_top_k() -> u32 {
    DEFAULT_TOP_K
}

fn default_session_top_k() -> u32 {
    DEFAULT_SESSION_TOP_K
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            top_k: DEFAULT_TOP_K,
            session_top_k: DEFAULT_SESSION_TOP_K,
        }
    }

    /// Load the user config, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Persist a new token (or remove it with `None`) without touching
    /// environment overrides.
    pub fn save_token(token: Option<&str>) -> Result<()> {
        let path = Self::get_config_path()?;
        let mut config = Self::load_from(&path).unwrap_or_else(|_| Self::new());
        config.token = token.map(str::to_string);
        config.save_to(&path)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DOCCHAT_API_URL") {
            self.api_url = url;
        }
        if let Ok(token) = std::env::var("DOCCHAT_TOKEN") {
            self.token = Some(token);
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("docchat").join("config.json"))
    }
}
