use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock as StdRwLock};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::{Mutex, RwLock};

use crate::ai::{image_prompt, ContentGenerator, IdeaRequest};
use crate::error::{AppError, Result};
use crate::models::{
    ActivityKind, AutomationSettings, ContentIdea, Draft, DraftEdit, FreshnessReport,
    GeneratedPost, IdeaSource, IdeaStatus, PostSample, SearchConsoleData, StyleGuide,
};
use crate::services::{ImageProvider, ImageProviders, Publisher};
use crate::store::{title_key, ContentState};

use super::events::EventSink;

const STYLE_SAMPLE_LIMIT: usize = 10;
const FRESHNESS_CONCURRENCY: usize = 3;

/// Moves ideas through drafting and publishing against the external
/// generator, image provider and CMS.
pub struct PipelineOrchestrator {
    state: RwLock<ContentState>,
    settings: RwLock<AutomationSettings>,
    generator: StdRwLock<Arc<dyn ContentGenerator>>,
    images: ImageProviders,
    publisher: Arc<dyn Publisher>,
    events: EventSink,
    // Held from reading the existing titles until the new ideas are stored.
    idea_lock: Mutex<()>,
    publishing: StdMutex<HashSet<i64>>,
}

impl PipelineOrchestrator {
    pub fn new(
        state: ContentState,
        settings: AutomationSettings,
        generator: Arc<dyn ContentGenerator>,
        publisher: Arc<dyn Publisher>,
        events: EventSink,
    ) -> Self {
        Self {
            state: RwLock::new(state),
            settings: RwLock::new(settings),
            generator: StdRwLock::new(generator),
            images: ImageProviders::new(),
            publisher,
            events,
            idea_lock: Mutex::new(()),
            publishing: StdMutex::new(HashSet::new()),
        }
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    fn generator(&self) -> Arc<dyn ContentGenerator> {
        self.generator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_generator(&self, generator: Arc<dyn ContentGenerator>) {
        *self
            .generator
            .write()
            .unwrap_or_else(PoisonError::into_inner) = generator;
    }

    pub async fn settings(&self) -> AutomationSettings {
        self.settings.read().await.clone()
    }

    pub async fn update_settings(&self, settings: AutomationSettings) {
        *self.settings.write().await = settings;
    }

    pub async fn snapshot(&self) -> ContentState {
        self.state.read().await.clone()
    }

    pub async fn has_style_guide(&self) -> bool {
        self.state.read().await.style_guide.is_some()
    }

    /// Report a failed operation to the user and hand the error back.
    fn surface<T>(&self, action: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_configuration() || e.is_validation() {
                self.events.warn(format!("Cannot {}: {}", action, e));
            } else {
                self.events.error(format!("Failed to {}: {}", action, e));
            }
        }
        result
    }

    // Ideas

    pub async fn add_idea(&self, title: &str) -> Result<ContentIdea> {
        let result = {
            let mut state = self.state.write().await;
            let ContentState { ideas, drafts, .. } = &mut *state;
            ideas.add(title, IdeaSource::Manual, drafts)
        };
        if let Ok(idea) = &result {
            self.events
                .activity(ActivityKind::IdeaAdded, format!("Idea added: {}", idea.title));
        }
        self.surface("add idea", result)
    }

    pub async fn archive_idea(&self, id: i64) -> Result<ContentIdea> {
        let result = {
            let mut state = self.state.write().await;
            let drafting = state
                .ideas
                .get(id)
                .is_some_and(|i| i.status == IdeaStatus::Active);
            if drafting {
                Err(AppError::IdeaBusy(id))
            } else {
                state.ideas.archive(id)
            }
        };
        if let Ok(idea) = &result {
            self.events
                .activity(ActivityKind::IdeaArchived, format!("Idea archived: {}", idea.title));
        }
        self.surface("archive idea", result)
    }

    pub async fn rename_idea(&self, id: i64, new_title: &str) -> Result<ContentIdea> {
        let result = self
            .state
            .write()
            .await
            .ideas
            .update_title(id, new_title)
            .cloned();
        if let Ok(idea) = &result {
            self.events
                .activity(ActivityKind::IdeaRenamed, format!("Idea renamed: {}", idea.title));
        }
        self.surface("rename idea", result)
    }

    pub async fn generate_ideas(
        &self,
        count: usize,
        is_auto: bool,
        search_data: Option<SearchConsoleData>,
    ) -> Result<Vec<ContentIdea>> {
        let result = self.try_generate_ideas(count, is_auto, search_data).await;
        self.surface("generate ideas", result)
    }

    async fn try_generate_ideas(
        &self,
        count: usize,
        is_auto: bool,
        search_data: Option<SearchConsoleData>,
    ) -> Result<Vec<ContentIdea>> {
        require_gemini_key(&self.settings().await)?;
        let _guard = self.idea_lock.lock().await;

        let (existing, style_guide) = {
            let state = self.state.read().await;
            (state.existing_titles(), state.style_guide.clone())
        };
        let search_data = search_data.filter(|d| !d.is_empty());
        let request = IdeaRequest {
            count,
            style_guide: style_guide.as_ref(),
            existing_titles: &existing,
            search_data: search_data.as_ref(),
        };

        let titles = self.generator().generate_ideas(request).await?;
        let source = if search_data.is_some() {
            IdeaSource::SearchConsole
        } else {
            IdeaSource::Ai
        };
        let added = self.store_generated(titles, count, source).await;
        self.report_generated(&added, is_auto);
        Ok(added)
    }

    pub async fn generate_similar_ideas(&self, idea_id: i64, count: usize) -> Result<Vec<ContentIdea>> {
        let result = self.try_generate_similar_ideas(idea_id, count).await;
        self.surface("generate similar ideas", result)
    }

    async fn try_generate_similar_ideas(&self, idea_id: i64, count: usize) -> Result<Vec<ContentIdea>> {
        require_gemini_key(&self.settings().await)?;
        let _guard = self.idea_lock.lock().await;

        let (base_title, existing, style_guide) = {
            let state = self.state.read().await;
            let base = state
                .ideas
                .get(idea_id)
                .map(|i| i.title.clone())
                .ok_or(AppError::IdeaNotFound(idea_id))?;
            (base, state.existing_titles(), state.style_guide.clone())
        };
        let request = IdeaRequest {
            count,
            style_guide: style_guide.as_ref(),
            existing_titles: &existing,
            search_data: None,
        };

        let titles = self
            .generator()
            .generate_similar_ideas(&base_title, request)
            .await?;
        let added = self.store_generated(titles, count, IdeaSource::Similar).await;
        self.report_generated(&added, false);
        Ok(added)
    }

    /// Insert up to `limit` titles, skipping blanks and anything already
    /// taken, including repeats within the batch.
    async fn store_generated(
        &self,
        titles: Vec<String>,
        limit: usize,
        source: IdeaSource,
    ) -> Vec<ContentIdea> {
        let mut state = self.state.write().await;
        let ContentState { ideas, drafts, .. } = &mut *state;

        let mut added = Vec::new();
        for title in titles {
            if added.len() >= limit {
                break;
            }
            match ideas.add(&title, source, drafts) {
                Ok(idea) => added.push(idea),
                Err(e) => tracing::debug!("Skipping generated idea {:?}: {}", title, e),
            }
        }
        added
    }

    fn report_generated(&self, added: &[ContentIdea], is_auto: bool) {
        if added.is_empty() {
            if is_auto {
                tracing::debug!("Automatic idea generation produced nothing new");
            } else {
                self.events
                    .warn("No new ideas were generated, all suggestions already exist");
            }
            return;
        }

        let titles: Vec<&str> = added.iter().map(|i| i.title.as_str()).collect();
        self.events.activity(
            ActivityKind::IdeasGenerated,
            format!("{} idea(s) generated: {}", added.len(), titles.join("; ")),
        );
        self.events
            .success(format!("{} new idea(s) generated", added.len()));
    }

    // Drafts

    pub async fn create_draft(&self, idea_id: i64) -> Result<Draft> {
        let result = self.try_create_draft(idea_id).await;
        self.surface("create draft", result)
    }

    async fn try_create_draft(&self, idea_id: i64) -> Result<Draft> {
        let settings = self.settings().await;
        require_gemini_key(&settings)?;
        let style_guide = self
            .state
            .read()
            .await
            .style_guide
            .clone()
            .ok_or(AppError::MissingStyleGuide)?;
        let generator = self.generator();
        let provider = self.images.select(&settings, generator.clone())?;

        let (title, previous_status) = self.claim_idea(idea_id).await?;
        let outcome = generate_post(&*generator, &*provider, &title, &style_guide).await;

        let mut state = self.state.write().await;
        let post = match outcome {
            Ok(post) => post,
            Err(e) => {
                // The idea may have been archived meanwhile; nothing to restore then.
                let _ = state.ideas.set_status(idea_id, previous_status);
                return Err(e);
            }
        };
        let ContentState { ideas, drafts, .. } = &mut *state;
        let draft = drafts.promote(ideas, idea_id, post)?;
        drop(state);

        self.events
            .activity(ActivityKind::DraftCreated, format!("Draft created: {}", draft.title));
        self.events
            .success(format!("Draft \"{}\" created (id {})", draft.title, draft.id));
        Ok(draft)
    }

    /// Mark an idea as being drafted so a second request for it fails fast.
    async fn claim_idea(&self, idea_id: i64) -> Result<(String, IdeaStatus)> {
        let mut state = self.state.write().await;
        let idea = state
            .ideas
            .get(idea_id)
            .ok_or(AppError::IdeaNotFound(idea_id))?;
        if idea.status == IdeaStatus::Active {
            return Err(AppError::IdeaBusy(idea_id));
        }
        let claimed = (idea.title.clone(), idea.status);
        state.ideas.set_status(idea_id, IdeaStatus::Active)?;
        Ok(claimed)
    }

    pub async fn update_draft(&self, id: i64, edit: DraftEdit) -> Result<Draft> {
        let result = self
            .state
            .write()
            .await
            .drafts
            .update(id, edit)
            .cloned();
        if let Ok(draft) = &result {
            self.events
                .activity(ActivityKind::DraftUpdated, format!("Draft updated: {}", draft.title));
        }
        self.surface("update draft", result)
    }

    pub async fn schedule_draft(&self, id: i64, at: DateTime<Utc>) -> Result<Draft> {
        let result = self
            .state
            .write()
            .await
            .drafts
            .schedule(id, at)
            .cloned();
        if let Ok(draft) = &result {
            self.events.activity(
                ActivityKind::DraftScheduled,
                format!("Draft \"{}\" scheduled for {}", draft.title, at.to_rfc3339()),
            );
        }
        self.surface("schedule draft", result)
    }

    pub async fn publish(&self, id: i64) -> Result<Draft> {
        let result = self.try_publish(id).await;
        self.surface("publish draft", result)
    }

    async fn try_publish(&self, id: i64) -> Result<Draft> {
        // Claim before reading so a publish finishing in between is seen.
        let _claim = InFlight::claim(&self.publishing, id).ok_or(AppError::PublishInProgress(id))?;
        let draft = self
            .state
            .read()
            .await
            .drafts
            .get(id)
            .cloned()
            .ok_or(AppError::DraftNotFound(id))?;
        if draft.is_published() {
            return Err(AppError::AlreadyPublished(id));
        }

        let receipt = self.publisher.publish(&draft).await?;
        let published = self
            .state
            .write()
            .await
            .drafts
            .mark_published(id, receipt.url, Utc::now())?;

        let url = published.url.as_deref().unwrap_or_default();
        self.events.activity(
            ActivityKind::PostPublished,
            format!("Post published: {} ({})", published.title, url),
        );
        self.events
            .success(format!("\"{}\" is live at {}", published.title, url));
        Ok(published)
    }

    // Style and freshness

    pub async fn refresh_style_guide(&self) -> Result<StyleGuide> {
        let result = self.try_refresh_style_guide().await;
        self.surface("analyze site style", result)
    }

    async fn try_refresh_style_guide(&self) -> Result<StyleGuide> {
        require_gemini_key(&self.settings().await)?;

        let mut samples = match self.publisher.recent_posts(STYLE_SAMPLE_LIMIT).await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!("Could not load recent posts for style analysis: {}", e);
                Vec::new()
            }
        };
        {
            let state = self.state.read().await;
            let seen: HashSet<String> = samples.iter().map(|s| title_key(&s.title)).collect();
            let remaining = STYLE_SAMPLE_LIMIT.saturating_sub(samples.len());
            samples.extend(
                state
                    .drafts
                    .published()
                    .filter(|d| !seen.contains(&title_key(&d.title)))
                    .take(remaining)
                    .map(|d| PostSample {
                        title: d.title.clone(),
                        content: d.content.clone(),
                    }),
            );
        }

        let guide = self.generator().analyze_style(&samples).await?;
        self.state.write().await.style_guide = Some(guide.clone());

        self.events.activity(
            ActivityKind::StyleGuideUpdated,
            format!("Style guide updated from {} post(s)", samples.len()),
        );
        self.events.info("Style guide updated");
        Ok(guide)
    }

    pub async fn analyze_freshness(&self, draft_id: i64) -> Result<FreshnessReport> {
        let result = self.try_analyze_freshness(draft_id).await;
        self.surface("analyze content freshness", result)
    }

    async fn try_analyze_freshness(&self, draft_id: i64) -> Result<FreshnessReport> {
        require_gemini_key(&self.settings().await)?;
        let post = self
            .state
            .read()
            .await
            .drafts
            .get(draft_id)
            .cloned()
            .ok_or(AppError::DraftNotFound(draft_id))?;
        if !post.is_published() {
            return Err(AppError::NotPublished(draft_id));
        }
        self.generator().analyze_content_freshness(&post).await
    }

    /// Freshness reports for every published post, a few at a time.
    /// Individual failures are reported and skipped.
    pub async fn analyze_all_freshness(&self) -> Result<Vec<(Draft, FreshnessReport)>> {
        let result = require_gemini_key(&self.settings().await);
        self.surface("analyze content freshness", result)?;

        let posts: Vec<Draft> = self.state.read().await.drafts.published().cloned().collect();
        let generator = self.generator();

        let reports: Vec<(Draft, FreshnessReport)> = stream::iter(posts)
            .map(|post| {
                let generator = generator.clone();
                async move {
                    match generator.analyze_content_freshness(&post).await {
                        Ok(report) => Some((post, report)),
                        Err(e) => {
                            self.events.error(format!(
                                "Freshness check failed for \"{}\": {}",
                                post.title, e
                            ));
                            None
                        }
                    }
                }
            })
            .buffer_unordered(FRESHNESS_CONCURRENCY)
            .filter_map(|r| async move { r })
            .collect()
            .await;
        Ok(reports)
    }

    // Automation

    /// One full-automatic pass: a single idea, drafted and optionally
    /// published after the configured delay.
    pub async fn run_full_cycle(&self) -> Result<Option<Draft>> {
        if !self.has_style_guide().await {
            tracing::warn!("Full-automatic cycle skipped: no style guide yet");
            return Ok(None);
        }

        let ideas = self.generate_ideas(1, true, None).await?;
        let Some(idea) = ideas.into_iter().next() else {
            return Ok(None);
        };
        let draft = self.create_draft(idea.id).await?;

        let settings = self.settings().await;
        if !settings.auto_publish {
            return Ok(Some(draft));
        }
        tokio::time::sleep(settings.auto_publish_delay()).await;
        self.publish(draft.id).await.map(Some)
    }
}

fn require_gemini_key(settings: &AutomationSettings) -> Result<()> {
    if settings.has_gemini_key() {
        Ok(())
    } else {
        Err(AppError::MissingApiKey("Gemini".to_string()))
    }
}

/// Draft text, then the image. Either failing yields no post at all.
async fn generate_post(
    generator: &dyn ContentGenerator,
    provider: &dyn ImageProvider,
    title: &str,
    style_guide: &StyleGuide,
) -> Result<GeneratedPost> {
    let content = generator.create_draft(title, style_guide).await?;

    let query = content
        .focus_keywords
        .first()
        .cloned()
        .unwrap_or_else(|| title.to_string());
    let prompt = image_prompt(title, &content.focus_keywords);
    let featured_image = provider.fetch_image(&query, &prompt).await?;
    tracing::debug!("Featured image for {:?} from {}", title, provider.name());

    Ok(GeneratedPost {
        content,
        featured_image,
    })
}

/// Membership in an in-flight set, released on drop.
struct InFlight<'a> {
    set: &'a StdMutex<HashSet<i64>>,
    id: i64,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a StdMutex<HashSet<i64>>, id: i64) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        inserted.then_some(Self { set, id })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::models::{DraftStatus, ImageSource, NoticeLevel};
    use crate::pipeline::PipelineEvent;
    use crate::services::SimulatedPublisher;
    use crate::store::DraftStore;
    use crate::testing::{sample_draft, sample_style_guide, FakeGenerator};

    fn settings() -> AutomationSettings {
        AutomationSettings {
            gemini_api_key: Some("gm-key".to_string()),
            ..Default::default()
        }
    }

    fn styled_state() -> ContentState {
        ContentState {
            style_guide: Some(sample_style_guide()),
            ..Default::default()
        }
    }

    fn orchestrator(
        generator: &Arc<FakeGenerator>,
        settings: AutomationSettings,
        state: ContentState,
    ) -> (PipelineOrchestrator, UnboundedReceiver<PipelineEvent>) {
        let (events, rx) = EventSink::channel();
        let publisher = Arc::new(SimulatedPublisher::new(Duration::ZERO));
        let orchestrator =
            PipelineOrchestrator::new(state, settings, generator.clone(), publisher, events);
        (orchestrator, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn notices(events: &[PipelineEvent], level: NoticeLevel) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::Notice(n) if n.level == level))
            .count()
    }

    fn activity_kinds(events: &[PipelineEvent]) -> Vec<ActivityKind> {
        events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Activity(a) => Some(a.kind),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn idea_becomes_draft_with_ai_image() {
        let generator = Arc::new(FakeGenerator::default());
        let (pipeline, _rx) = orchestrator(&generator, settings(), styled_state());

        let idea = pipeline.add_idea("SEO Tips").await.unwrap();
        let draft = pipeline.create_draft(idea.id).await.unwrap();

        assert_eq!(draft.title, "SEO Tips");
        assert_eq!(draft.status, DraftStatus::Draft);
        assert_eq!(draft.meta_title, "SEO Tips");
        assert_eq!(draft.featured_image.mime_type, "image/png");
        assert_eq!(generator.image_calls(), 1);

        let state = pipeline.snapshot().await;
        assert!(state.ideas.get(idea.id).is_none());
        assert_eq!(state.drafts.len(), 1);
    }

    #[tokio::test]
    async fn failed_image_leaves_idea_and_drafts_untouched() {
        let generator = Arc::new(FakeGenerator::default());
        generator.fail_images();
        let (pipeline, mut rx) = orchestrator(&generator, settings(), styled_state());
        let idea = pipeline.add_idea("SEO Tips").await.unwrap();
        drain(&mut rx);

        let err = pipeline.create_draft(idea.id).await.unwrap_err();
        assert!(matches!(err, AppError::ImageProvider(_)));

        let state = pipeline.snapshot().await;
        assert_eq!(state.ideas.get(idea.id), Some(&idea));
        assert!(state.drafts.is_empty());
        assert_eq!(notices(&drain(&mut rx), NoticeLevel::Error), 1);
    }

    #[tokio::test]
    async fn missing_stock_key_fails_before_any_generation() {
        let generator = Arc::new(FakeGenerator::default());
        let settings = AutomationSettings {
            image_source: ImageSource::Unsplash,
            ..settings()
        };
        let (pipeline, mut rx) = orchestrator(&generator, settings, styled_state());
        let idea = pipeline.add_idea("SEO Tips").await.unwrap();
        drain(&mut rx);

        let err = pipeline.create_draft(idea.id).await.unwrap_err();
        assert!(matches!(err, AppError::MissingApiKey(ref p) if p == "Unsplash"));
        assert_eq!(generator.draft_calls(), 0);
        assert_eq!(notices(&drain(&mut rx), NoticeLevel::Warning), 1);
        assert_eq!(pipeline.snapshot().await.ideas.get(idea.id), Some(&idea));
    }

    #[tokio::test]
    async fn drafting_requires_style_guide_and_gemini_key() {
        let generator = Arc::new(FakeGenerator::default());
        let (pipeline, _rx) = orchestrator(&generator, settings(), ContentState::default());
        let idea = pipeline.add_idea("SEO Tips").await.unwrap();
        let err = pipeline.create_draft(idea.id).await.unwrap_err();
        assert!(matches!(err, AppError::MissingStyleGuide));

        let (pipeline, _rx) =
            orchestrator(&generator, AutomationSettings::default(), styled_state());
        let idea = pipeline.add_idea("SEO Tips").await.unwrap();
        let err = pipeline.create_draft(idea.id).await.unwrap_err();
        assert!(matches!(err, AppError::MissingApiKey(_)));

        assert_eq!(generator.draft_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_draft_request_for_same_idea_is_rejected() {
        let generator =
            Arc::new(FakeGenerator::default().with_draft_delay(Duration::from_secs(5)));
        let (pipeline, _rx) = orchestrator(&generator, settings(), styled_state());
        let idea = pipeline.add_idea("SEO Tips").await.unwrap();

        let (first, second) =
            tokio::join!(pipeline.create_draft(idea.id), pipeline.create_draft(idea.id));

        assert!(first.is_ok());
        assert!(matches!(second, Err(AppError::IdeaBusy(id)) if id == idea.id));
        assert_eq!(generator.draft_calls(), 1);
    }

    #[tokio::test]
    async fn generated_ideas_are_deduplicated() {
        let generator = Arc::new(FakeGenerator::with_ideas(&[
            "seo tips",
            "Rust Basics",
            " rust basics ",
            "",
            "Tokio Timers",
        ]));
        let (pipeline, _rx) = orchestrator(&generator, settings(), ContentState::default());
        pipeline.add_idea("SEO Tips").await.unwrap();

        let added = pipeline.generate_ideas(5, false, None).await.unwrap();

        let titles: Vec<&str> = added.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Rust Basics", "Tokio Timers"]);
        assert!(added.iter().all(|i| i.source == IdeaSource::Ai));
        assert_eq!(pipeline.snapshot().await.ideas.active().len(), 3);
    }

    #[tokio::test]
    async fn generated_ideas_respect_count_and_search_source() {
        let generator = Arc::new(FakeGenerator::with_ideas(&["One", "Two", "Three"]));
        let (pipeline, _rx) = orchestrator(&generator, settings(), ContentState::default());
        let search = SearchConsoleData {
            top_queries: vec!["rust async".to_string()],
            underperforming_pages: Vec::new(),
        };

        let added = pipeline.generate_ideas(2, false, Some(search)).await.unwrap();

        assert_eq!(added.len(), 2);
        assert!(added.iter().all(|i| i.source == IdeaSource::SearchConsole));
    }

    #[tokio::test]
    async fn empty_generation_warns_only_when_manual() {
        let generator = Arc::new(FakeGenerator::default());
        let (pipeline, mut rx) = orchestrator(&generator, settings(), ContentState::default());

        assert!(pipeline.generate_ideas(5, true, None).await.unwrap().is_empty());
        assert!(drain(&mut rx).is_empty());

        assert!(pipeline.generate_ideas(5, false, None).await.unwrap().is_empty());
        assert_eq!(notices(&drain(&mut rx), NoticeLevel::Warning), 1);
    }

    #[tokio::test]
    async fn similar_ideas_need_an_existing_base() {
        let generator = Arc::new(FakeGenerator::with_ideas(&["SEO Tips", "SEO for Shops"]));
        let (pipeline, _rx) = orchestrator(&generator, settings(), ContentState::default());

        let err = pipeline.generate_similar_ideas(7, 3).await.unwrap_err();
        assert!(matches!(err, AppError::IdeaNotFound(7)));

        let base = pipeline.add_idea("SEO Tips").await.unwrap();
        let added = pipeline.generate_similar_ideas(base.id, 3).await.unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].title, "SEO for Shops");
        assert_eq!(added[0].source, IdeaSource::Similar);
    }

    #[tokio::test]
    async fn publishing_sets_url_from_slug_and_only_once() {
        let generator = Arc::new(FakeGenerator::default());
        let state = ContentState {
            drafts: DraftStore::restore(vec![sample_draft(42, "Hello World")]),
            ..styled_state()
        };
        let (pipeline, _rx) = orchestrator(&generator, settings(), state);

        let post = pipeline.publish(42).await.unwrap();
        assert_eq!(post.status, DraftStatus::Published);
        assert_eq!(post.url.as_deref(), Some("/blog/hello-world-42"));
        assert!(post.published_at.is_some());

        let err = pipeline.publish(42).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyPublished(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_idea_requests_run_one_at_a_time() {
        let generator = Arc::new(
            FakeGenerator::with_ideas(&["SEO Tips", "Link Building"])
                .with_idea_delay(Duration::from_secs(1)),
        );
        let (pipeline, _rx) = orchestrator(&generator, settings(), styled_state());

        let (first, second) = tokio::join!(
            pipeline.generate_ideas(2, false, None),
            pipeline.generate_ideas(2, false, None)
        );
        assert_eq!(first.unwrap().len(), 2);
        assert!(second.unwrap().is_empty());

        let state = pipeline.snapshot().await;
        for title in ["SEO Tips", "Link Building"] {
            let stored = state.ideas.active().iter().filter(|i| i.title == title).count();
            assert_eq!(stored, 1, "{title}");
        }

        let seen = generator.seen_titles();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].is_empty());
        assert_eq!(seen[1].len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_publishes_reach_the_site_once() {
        let generator = Arc::new(FakeGenerator::default());
        let state = ContentState {
            drafts: DraftStore::restore(vec![sample_draft(42, "Hello World")]),
            ..styled_state()
        };
        let publisher = Arc::new(SimulatedPublisher::new(Duration::from_secs(2)));
        let (events, _rx) = EventSink::channel();
        let pipeline =
            PipelineOrchestrator::new(state, settings(), generator, publisher.clone(), events);

        let (first, second) = tokio::join!(pipeline.publish(42), pipeline.publish(42));
        assert!(first.is_ok());
        assert!(matches!(second, Err(AppError::PublishInProgress(42))));

        let again = pipeline.publish(42).await;
        assert!(matches!(again, Err(AppError::AlreadyPublished(42))));
        assert_eq!(publisher.recent_posts(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn archived_ideas_leave_the_active_list() {
        let generator = Arc::new(FakeGenerator::default());
        let (pipeline, mut rx) = orchestrator(&generator, settings(), ContentState::default());
        let idea = pipeline.add_idea("Old Topic").await.unwrap();

        let archived = pipeline.archive_idea(idea.id).await.unwrap();
        assert_eq!(archived.status, IdeaStatus::Archived);

        let state = pipeline.snapshot().await;
        assert!(state.ideas.active().is_empty());
        assert_eq!(state.ideas.archived().len(), 1);
        assert_eq!(
            activity_kinds(&drain(&mut rx)),
            [ActivityKind::IdeaAdded, ActivityKind::IdeaArchived]
        );
    }

    #[tokio::test]
    async fn style_refresh_uses_published_drafts() {
        let generator = Arc::new(FakeGenerator::default());
        let mut published = sample_draft(1, "Shipped");
        published.status = DraftStatus::Published;
        let state = ContentState {
            drafts: DraftStore::restore(vec![published]),
            ..Default::default()
        };
        let (pipeline, _rx) = orchestrator(&generator, settings(), state);

        assert!(!pipeline.has_style_guide().await);
        pipeline.refresh_style_guide().await.unwrap();
        assert!(pipeline.has_style_guide().await);
        assert_eq!(generator.style_calls(), 1);
    }

    #[tokio::test]
    async fn freshness_only_for_published_posts() {
        let generator = Arc::new(FakeGenerator::default());
        let mut published = sample_draft(2, "Live Post");
        published.status = DraftStatus::Published;
        let state = ContentState {
            drafts: DraftStore::restore(vec![sample_draft(1, "Draft Post"), published]),
            ..Default::default()
        };
        let (pipeline, _rx) = orchestrator(&generator, settings(), state);

        let err = pipeline.analyze_freshness(1).await.unwrap_err();
        assert!(matches!(err, AppError::NotPublished(1)));

        let report = pipeline.analyze_freshness(2).await.unwrap();
        assert!(report.needs_update);

        let all = pipeline.analyze_all_freshness().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0.id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn full_cycle_drafts_and_publishes_one_idea() {
        let generator = Arc::new(FakeGenerator::with_ideas(&["Cycle Topic", "Another"]));
        let settings = AutomationSettings {
            auto_publish: true,
            ..settings()
        };
        let (pipeline, mut rx) = orchestrator(&generator, settings, styled_state());

        let post = pipeline.run_full_cycle().await.unwrap().unwrap();

        assert_eq!(post.title, "Cycle Topic");
        assert!(post.is_published());
        assert_eq!(
            activity_kinds(&drain(&mut rx)),
            [
                ActivityKind::IdeasGenerated,
                ActivityKind::DraftCreated,
                ActivityKind::PostPublished
            ]
        );
    }

    #[tokio::test]
    async fn full_cycle_waits_for_style_guide() {
        let generator = Arc::new(FakeGenerator::with_ideas(&["Cycle Topic"]));
        let (pipeline, _rx) = orchestrator(&generator, settings(), ContentState::default());

        assert!(pipeline.run_full_cycle().await.unwrap().is_none());
        assert_eq!(generator.idea_calls(), 0);
    }
}
