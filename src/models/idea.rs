use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdeaStatus {
    #[default]
    New,
    /// A draft is currently being generated from this idea.
    Active,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdeaSource {
    Ai,
    SearchConsole,
    Similar,
    Manual,
}

impl IdeaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaStatus::New => "new",
            IdeaStatus::Active => "active",
            IdeaStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(IdeaStatus::New),
            "active" => Some(IdeaStatus::Active),
            "archived" => Some(IdeaStatus::Archived),
            _ => None,
        }
    }
}

impl IdeaSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaSource::Ai => "ai",
            IdeaSource::SearchConsole => "search-console",
            IdeaSource::Similar => "similar",
            IdeaSource::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ai" => Some(IdeaSource::Ai),
            "search-console" => Some(IdeaSource::SearchConsole),
            "similar" => Some(IdeaSource::Similar),
            "manual" => Some(IdeaSource::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentIdea {
    pub id: i64,
    pub title: String,
    pub status: IdeaStatus,
    pub source: IdeaSource,
    pub created_at: DateTime<Utc>,
}

/// Search Console signal used to bias idea generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchConsoleData {
    #[serde(default)]
    pub top_queries: Vec<String>,
    #[serde(default)]
    pub underperforming_pages: Vec<String>,
}

impl SearchConsoleData {
    pub fn is_empty(&self) -> bool {
        self.top_queries.is_empty() && self.underperforming_pages.is_empty()
    }
}
