use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutomationMode {
    #[default]
    Manual,
    SemiAutomatic,
    FullAutomatic,
}

impl AutomationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationMode::Manual => "manual",
            AutomationMode::SemiAutomatic => "semi-automatic",
            AutomationMode::FullAutomatic => "full-automatic",
        }
    }
}

impl fmt::Display for AutomationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutomationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(AutomationMode::Manual),
            "semi-automatic" | "semi" => Ok(AutomationMode::SemiAutomatic),
            "full-automatic" | "full" => Ok(AutomationMode::FullAutomatic),
            other => Err(format!("Unknown automation mode: {}", other)),
        }
    }
}

/// Where featured images come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    #[default]
    Ai,
    Pexels,
    Unsplash,
    Pixabay,
}

impl ImageSource {
    pub fn display_name(&self) -> &'static str {
        match self {
            ImageSource::Ai => "Gemini",
            ImageSource::Pexels => "Pexels",
            ImageSource::Unsplash => "Unsplash",
            ImageSource::Pixabay => "Pixabay",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationSettings {
    #[serde(default)]
    pub mode: AutomationMode,

    #[serde(default)]
    pub auto_publish: bool,

    #[serde(default)]
    pub image_source: ImageSource,

    pub gemini_api_key: Option<String>,
    pub pexels_api_key: Option<String>,
    pub unsplash_api_key: Option<String>,
    pub pixabay_api_key: Option<String>,

    #[serde(default = "default_idea_frequency")]
    pub idea_frequency_minutes: u32,

    #[serde(default = "default_full_cycle_frequency")]
    pub full_cycle_frequency_minutes: u32,

    #[serde(default = "default_style_refresh_frequency")]
    pub style_refresh_minutes: u32,

    #[serde(default = "default_auto_publish_delay")]
    pub auto_publish_delay_secs: u64,

    #[serde(default = "default_ideas_per_run")]
    pub ideas_per_run: usize,
}

fn default_idea_frequency() -> u32 {
    15
}

fn default_full_cycle_frequency() -> u32 {
    30
}

fn default_style_refresh_frequency() -> u32 {
    30
}

fn default_auto_publish_delay() -> u64 {
    2
}

fn default_ideas_per_run() -> usize {
    5
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            mode: AutomationMode::Manual,
            auto_publish: false,
            image_source: ImageSource::Ai,
            gemini_api_key: None,
            pexels_api_key: None,
            unsplash_api_key: None,
            pixabay_api_key: None,
            idea_frequency_minutes: default_idea_frequency(),
            full_cycle_frequency_minutes: default_full_cycle_frequency(),
            style_refresh_minutes: default_style_refresh_frequency(),
            auto_publish_delay_secs: default_auto_publish_delay(),
            ideas_per_run: default_ideas_per_run(),
        }
    }
}

impl AutomationSettings {
    pub fn has_gemini_key(&self) -> bool {
        non_blank(&self.gemini_api_key).is_some()
    }

    /// Key for a stock provider; `None` for the AI source or a blank key.
    pub fn stock_api_key(&self, source: ImageSource) -> Option<&str> {
        match source {
            ImageSource::Ai => None,
            ImageSource::Pexels => non_blank(&self.pexels_api_key),
            ImageSource::Unsplash => non_blank(&self.unsplash_api_key),
            ImageSource::Pixabay => non_blank(&self.pixabay_api_key),
        }
    }

    pub fn idea_period(&self) -> Duration {
        minutes(self.idea_frequency_minutes)
    }

    pub fn full_cycle_period(&self) -> Duration {
        minutes(self.full_cycle_frequency_minutes)
    }

    pub fn style_refresh_period(&self) -> Duration {
        minutes(self.style_refresh_minutes)
    }

    pub fn auto_publish_delay(&self) -> Duration {
        Duration::from_secs(self.auto_publish_delay_secs)
    }
}

fn non_blank(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}

// A zero period would make tokio's interval panic.
fn minutes(m: u32) -> Duration {
    Duration::from_secs(u64::from(m.max(1)) * 60)
}
