mod activity;
mod draft;
mod idea;
mod settings;
mod style;

pub use activity::{ActivityEntry, ActivityKind, NoticeLevel, Notification};
pub use draft::{
    clamp_keywords, post_slug, Draft, DraftContent, DraftEdit, DraftStatus, GeneratedPost,
    ImagePayload,
};
pub use idea::{ContentIdea, IdeaSource, IdeaStatus, SearchConsoleData};
pub use settings::{AutomationMode, AutomationSettings, ImageSource};
pub use style::{FreshnessReport, PostSample, StyleGuide};
