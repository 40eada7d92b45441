//! Application configuration.
//!
//! Stored at `~/.config/garnison/config.json`. The API base URL can be
//! overridden with `GARNISON_API_URL` (a `.env` file is honored by the CLI).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "garnison";

const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_url`
pub const API_URL_ENV: &str = "GARNISON_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Strapi base URL, e.g. `https://cms.centre.ma`
    pub api_url: Option<String>,
    /// Institution lines printed at the top of every report page
    pub letterhead: Vec<String>,
    pub logo_url: Option<String>,
    /// Decorative frame for certificates
    pub border_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// API base URL from the environment, then the config file
    pub fn api_url(&self) -> Result<String> {
        self.api_url_with(std::env::var(API_URL_ENV).ok())
    }

    fn api_url_with(&self, env_value: Option<String>) -> Result<String> {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_url.clone().filter(|v| !v.trim().is_empty()))
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No API URL configured. Set {} or `api_url` in {}",
                    API_URL_ENV,
                    CONFIG_FILE
                )
            })
    }

    /// Where exported PDFs go; the working directory by default
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
