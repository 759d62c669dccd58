use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    IdeaAdded,
    IdeasGenerated,
    IdeaArchived,
    IdeaRenamed,
    DraftCreated,
    DraftUpdated,
    DraftScheduled,
    PostPublished,
    StyleGuideUpdated,
    AutomationModeChanged,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::IdeaAdded => "idea_added",
            ActivityKind::IdeasGenerated => "ideas_generated",
            ActivityKind::IdeaArchived => "idea_archived",
            ActivityKind::IdeaRenamed => "idea_renamed",
            ActivityKind::DraftCreated => "draft_created",
            ActivityKind::DraftUpdated => "draft_updated",
            ActivityKind::DraftScheduled => "draft_scheduled",
            ActivityKind::PostPublished => "post_published",
            ActivityKind::StyleGuideUpdated => "style_guide_updated",
            ActivityKind::AutomationModeChanged => "automation_mode_changed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            ActivityKind::IdeaAdded,
            ActivityKind::IdeasGenerated,
            ActivityKind::IdeaArchived,
            ActivityKind::IdeaRenamed,
            ActivityKind::DraftCreated,
            ActivityKind::DraftUpdated,
            ActivityKind::DraftScheduled,
            ActivityKind::PostPublished,
            ActivityKind::StyleGuideUpdated,
            ActivityKind::AutomationModeChanged,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(kind: ActivityKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-facing notice, the CLI counterpart of a toast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
}
