//! Fixtures shared by unit tests across modules.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::ai::{ContentGenerator, IdeaRequest};
use crate::error::{AppError, Result};
use crate::models::{
    Draft, DraftContent, DraftStatus, FreshnessReport, ImagePayload, PostSample, StyleGuide,
};

pub fn sample_image() -> ImagePayload {
    ImagePayload {
        mime_type: "image/png".to_string(),
        data: "iVBORw0KGgo=".to_string(),
    }
}

pub fn sample_draft(id: i64, title: &str) -> Draft {
    Draft {
        id,
        title: title.to_string(),
        content: "<p>Sample</p>".to_string(),
        meta_title: title.to_string(),
        meta_description: format!("All about {}", title),
        focus_keywords: vec!["sample".to_string()],
        featured_image: sample_image(),
        created_at: Utc::now(),
        status: DraftStatus::Draft,
        scheduled_for: None,
        published_at: None,
        url: None,
    }
}

pub fn sample_style_guide() -> StyleGuide {
    StyleGuide {
        tone: "friendly".to_string(),
        sentence_structure: "short".to_string(),
        paragraph_length: "two to three sentences".to_string(),
        formatting: "h2 sections with bullet lists".to_string(),
        summary: "Practical and direct".to_string(),
        analyzed_at: Utc::now(),
    }
}

/// Scripted generator that counts calls.
#[derive(Default)]
pub struct FakeGenerator {
    ideas: Mutex<Vec<String>>,
    seen_titles: Mutex<Vec<Vec<String>>>,
    fail_next_ideas: AtomicBool,
    fail_images: AtomicBool,
    idea_delay: Duration,
    draft_delay: Duration,
    style_calls: AtomicUsize,
    idea_calls: AtomicUsize,
    draft_calls: AtomicUsize,
    image_calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn with_ideas(titles: &[&str]) -> Self {
        let generator = Self::default();
        generator.set_ideas(titles);
        generator
    }

    pub fn with_draft_delay(mut self, delay: Duration) -> Self {
        self.draft_delay = delay;
        self
    }

    pub fn with_idea_delay(mut self, delay: Duration) -> Self {
        self.idea_delay = delay;
        self
    }

    pub fn set_ideas(&self, titles: &[&str]) {
        *self.ideas.lock().unwrap() = titles.iter().map(|t| t.to_string()).collect();
    }

    /// The next idea request fails; later ones succeed again.
    pub fn fail_next_ideas(&self) {
        self.fail_next_ideas.store(true, Ordering::SeqCst);
    }

    /// Existing titles passed with each idea request, in call order.
    pub fn seen_titles(&self) -> Vec<Vec<String>> {
        self.seen_titles.lock().unwrap().clone()
    }

    pub fn fail_images(&self) {
        self.fail_images.store(true, Ordering::SeqCst);
    }

    pub fn style_calls(&self) -> usize {
        self.style_calls.load(Ordering::SeqCst)
    }

    pub fn idea_calls(&self) -> usize {
        self.idea_calls.load(Ordering::SeqCst)
    }

    pub fn draft_calls(&self) -> usize {
        self.draft_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn analyze_style(&self, _samples: &[PostSample]) -> Result<StyleGuide> {
        self.style_calls.fetch_add(1, Ordering::SeqCst);
        Ok(sample_style_guide())
    }

    async fn generate_ideas(&self, request: IdeaRequest<'_>) -> Result<Vec<String>> {
        self.idea_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_titles
            .lock()
            .unwrap()
            .push(request.existing_titles.to_vec());
        if !self.idea_delay.is_zero() {
            tokio::time::sleep(self.idea_delay).await;
        }
        if self.fail_next_ideas.swap(false, Ordering::SeqCst) {
            return Err(AppError::GeminiApi("quota exceeded".to_string()));
        }
        Ok(self.ideas.lock().unwrap().clone())
    }

    async fn generate_similar_ideas(
        &self,
        _base_title: &str,
        request: IdeaRequest<'_>,
    ) -> Result<Vec<String>> {
        self.generate_ideas(request).await
    }

    async fn create_draft(&self, title: &str, _style_guide: &StyleGuide) -> Result<DraftContent> {
        self.draft_calls.fetch_add(1, Ordering::SeqCst);
        if !self.draft_delay.is_zero() {
            tokio::time::sleep(self.draft_delay).await;
        }
        Ok(DraftContent {
            title: title.to_string(),
            content: format!("<h2>{}</h2><p>Body</p>", title),
            meta_title: String::new(),
            meta_description: format!("Learn about {}", title),
            focus_keywords: vec!["seo".to_string(), "content".to_string()],
        })
    }

    async fn generate_image(&self, _prompt: &str) -> Result<ImagePayload> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_images.load(Ordering::SeqCst) {
            return Err(AppError::ImageProvider("no image returned".to_string()));
        }
        Ok(sample_image())
    }

    async fn analyze_content_freshness(&self, _post: &Draft) -> Result<FreshnessReport> {
        Ok(FreshnessReport {
            score: 72,
            needs_update: true,
            suggestions: vec!["Refresh the statistics".to_string()],
        })
    }
}
