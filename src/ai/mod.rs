mod gemini;
mod parse;
mod prompts;

use async_trait::async_trait;

pub use gemini::{GeminiClient, DEFAULT_TEXT_MODEL};
pub use prompts::featured_image as image_prompt;

use crate::error::Result;
use crate::models::{
    Draft, DraftContent, FreshnessReport, ImagePayload, PostSample, SearchConsoleData, StyleGuide,
};

/// Input for a batch of new ideas.
#[derive(Debug, Clone, Copy)]
pub struct IdeaRequest<'a> {
    pub count: usize,
    pub style_guide: Option<&'a StyleGuide>,
    pub existing_titles: &'a [String],
    pub search_data: Option<&'a SearchConsoleData>,
}

/// The generative backend. Implementations return parsed values; raw
/// response handling stays inside the implementation.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn analyze_style(&self, samples: &[PostSample]) -> Result<StyleGuide>;

    async fn generate_ideas(&self, request: IdeaRequest<'_>) -> Result<Vec<String>>;

    async fn generate_similar_ideas(
        &self,
        base_title: &str,
        request: IdeaRequest<'_>,
    ) -> Result<Vec<String>>;

    async fn create_draft(&self, title: &str, style_guide: &StyleGuide) -> Result<DraftContent>;

    async fn generate_image(&self, prompt: &str) -> Result<ImagePayload>;

    async fn analyze_content_freshness(&self, post: &Draft) -> Result<FreshnessReport>;
}
