mod drafts;
mod ideas;

use chrono::Utc;

pub use drafts::DraftStore;
pub use ideas::IdeaStore;

use crate::models::StyleGuide;

/// Millisecond-timestamp ids that never repeat or go backwards, even when
/// several are handed out within the same millisecond.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn seeded(max_existing: i64) -> Self {
        Self { last: max_existing }
    }

    pub fn next_id(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        self.last
    }
}

/// Comparison key for title uniqueness.
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Everything the pipeline mutates, owned in one place.
#[derive(Debug, Clone, Default)]
pub struct ContentState {
    pub ideas: IdeaStore,
    pub drafts: DraftStore,
    pub style_guide: Option<StyleGuide>,
}

impl ContentState {
    /// Titles of active ideas and all drafts, i.e. everything a new idea
    /// must not repeat. Archived ideas are free to come back.
    pub fn existing_titles(&self) -> Vec<String> {
        self.ideas
            .active()
            .iter()
            .map(|i| i.title.clone())
            .chain(self.drafts.iter().map(|d| d.title.clone()))
            .collect()
    }
}
