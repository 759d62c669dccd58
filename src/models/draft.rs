use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_FOCUS_KEYWORDS: usize = 5;

static WHITESPACE: OnceLock<Regex> = OnceLock::new();
static NON_SLUG: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    #[default]
    Draft,
    Published,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(DraftStatus::Draft),
            "published" => Some(DraftStatus::Published),
            _ => None,
        }
    }
}

/// Base64 encoded image with its mime type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

/// Post body and SEO metadata as returned by the generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub meta_title: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub focus_keywords: Vec<String>,
}

/// A complete generation result. It cannot exist without an image, so a
/// failed image step never produces a draft.
#[derive(Debug, Clone)]
pub struct GeneratedPost {
    pub content: DraftContent,
    pub featured_image: ImagePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub meta_title: String,
    pub meta_description: String,
    pub focus_keywords: Vec<String>,
    pub featured_image: ImagePayload,
    pub created_at: DateTime<Utc>,
    pub status: DraftStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

impl Draft {
    pub fn is_published(&self) -> bool {
        self.status == DraftStatus::Published
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == DraftStatus::Draft && self.scheduled_for.is_some()
    }

    pub fn slug(&self) -> String {
        post_slug(&self.title, self.id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DraftEdit {
    pub title: Option<String>,
    pub content: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub focus_keywords: Option<Vec<String>>,
}

impl DraftEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.meta_title.is_none()
            && self.meta_description.is_none()
            && self.focus_keywords.is_none()
    }
}

/// Keep at most five non-blank keywords, in order.
pub fn clamp_keywords(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .take(MAX_FOCUS_KEYWORDS)
        .collect()
}

/// URL slug for a post: lowercase title, whitespace runs become `-`,
/// anything outside `[a-z0-9-]` is dropped, and the id is appended.
pub fn post_slug(title: &str, id: i64) -> String {
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let non_slug = NON_SLUG.get_or_init(|| Regex::new(r"[^a-z0-9-]").expect("valid regex"));

    let lowered = title.trim().to_lowercase();
    let hyphenated = whitespace.replace_all(&lowered, "-");
    let base = non_slug.replace_all(&hyphenated, "");
    let base = base.trim_matches('-');

    if base.is_empty() {
        format!("post-{}", id)
    } else {
        format!("{}-{}", base, id)
    }
}
