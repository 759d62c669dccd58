use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ai::DEFAULT_TEXT_MODEL;
use crate::error::{AppError, Result};
use crate::models::AutomationSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default)]
    pub automation: AutomationSettings,

    #[serde(default)]
    pub publisher: PublisherConfig,
}

/// Where finished posts go. Without an endpoint, publishing is simulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub application_password: Option<String>,

    #[serde(default = "default_simulated_delay")]
    pub simulated_delay_ms: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("content-agent");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("content.db").to_string_lossy().to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

fn default_simulated_delay() -> u64 {
    1500
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            username: None,
            application_password: None,
            simulated_delay_ms: default_simulated_delay(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            gemini_model: default_gemini_model(),
            automation: AutomationSettings::default(),
            publisher: PublisherConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("content-agent")
            .join("config.toml")
    }
}
