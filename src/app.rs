use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::ai::{ContentGenerator, GeminiClient};
use crate::cli::{AppAction, USAGE};
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{Draft, FreshnessReport, NoticeLevel, Notification, SearchConsoleData};
use crate::pipeline::{EventSink, PipelineEvent, PipelineOrchestrator};
use crate::scheduler::AutomationScheduler;
use crate::services::publisher_from_config;
use crate::store::ContentState;

const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct App {
    config: Config,
    repository: Repository,
    pipeline: Arc<PipelineOrchestrator>,
    /// State as last loaded or written through `repository`.
    saved: ContentState,
    events_rx: mpsc::UnboundedReceiver<PipelineEvent>,
}

fn build_generator(config: &Config) -> Arc<dyn ContentGenerator> {
    let api_key = config.automation.gemini_api_key.clone().unwrap_or_default();
    Arc::new(GeminiClient::new(api_key, Some(config.gemini_model.clone())))
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let state = repository.load_state().await?;
        let publisher = publisher_from_config(&config.publisher)?;
        let (events, events_rx) = EventSink::channel();

        let pipeline = PipelineOrchestrator::new(
            state.clone(),
            config.automation.clone(),
            build_generator(&config),
            publisher,
            events,
        );

        Ok(Self {
            config,
            repository,
            pipeline: Arc::new(pipeline),
            saved: state,
            events_rx,
        })
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<()> {
        if action.writes_content() {
            if let Some(pid) = self.repository.running_daemon().await? {
                return Err(AppError::DaemonRunning(pid));
            }
        }
        let result = self.dispatch(action).await;
        // Keep whatever did change, even when the command itself failed.
        self.drain_events().await;
        self.save_state().await?;
        result
    }

    async fn dispatch(&mut self, action: AppAction) -> Result<()> {
        match action {
            AppAction::Help => print!("{}", USAGE),

            AppAction::Run => self.run_daemon().await?,

            AppAction::List => self.print_overview().await,

            AppAction::AddIdea(title) => {
                let idea = self.pipeline.add_idea(&title).await?;
                println!("Added idea {} \"{}\"", idea.id, idea.title);
            }

            AppAction::GenerateIdeas { count, queries } => {
                let count = count.unwrap_or(self.config.automation.ideas_per_run);
                let search_data = (!queries.is_empty()).then(|| SearchConsoleData {
                    top_queries: queries,
                    underperforming_pages: Vec::new(),
                });
                let ideas = self.pipeline.generate_ideas(count, false, search_data).await?;
                for idea in ideas {
                    println!("{:>15}  {}", idea.id, idea.title);
                }
            }

            AppAction::Similar { idea_id, count } => {
                let ideas = self.pipeline.generate_similar_ideas(idea_id, count).await?;
                for idea in ideas {
                    println!("{:>15}  {}", idea.id, idea.title);
                }
            }

            AppAction::Archive(id) => {
                let idea = self.pipeline.archive_idea(id).await?;
                println!("Archived \"{}\"", idea.title);
            }

            AppAction::Rename { idea_id, title } => {
                let idea = self.pipeline.rename_idea(idea_id, &title).await?;
                println!("Idea {} is now \"{}\"", idea.id, idea.title);
            }

            AppAction::Draft(idea_id) => {
                println!("Writing draft, this can take a minute...");
                let draft = self.pipeline.create_draft(idea_id).await?;
                print_draft(&draft);
            }

            AppAction::EditDraft {
                draft_id,
                mut edit,
                content_file,
            } => {
                if let Some(path) = content_file {
                    edit.content = Some(std::fs::read_to_string(&path)?);
                }
                let draft = self.pipeline.update_draft(draft_id, edit).await?;
                print_draft(&draft);
            }

            AppAction::Schedule { draft_id, at } => {
                let draft = self.pipeline.schedule_draft(draft_id, at).await?;
                println!(
                    "\"{}\" scheduled for {}",
                    draft.title,
                    at.format("%Y-%m-%d %H:%M UTC")
                );
            }

            AppAction::Publish(draft_id) => {
                let post = self.pipeline.publish(draft_id).await?;
                println!(
                    "Published \"{}\" at {}",
                    post.title,
                    post.url.as_deref().unwrap_or_default()
                );
            }

            AppAction::Freshness(Some(draft_id)) => {
                let report = self.pipeline.analyze_freshness(draft_id).await?;
                print_freshness(draft_id, &report);
            }

            AppAction::Freshness(None) => {
                let reports = self.pipeline.analyze_all_freshness().await?;
                if reports.is_empty() {
                    println!("No published posts to check.");
                }
                for (post, report) in reports {
                    println!("{}", post.title);
                    print_freshness(post.id, &report);
                }
            }

            AppAction::AnalyzeStyle => {
                let guide = self.pipeline.refresh_style_guide().await?;
                println!("{}", guide.as_prompt());
            }

            AppAction::SetMode(mode) => {
                self.config.automation.mode = mode;
                self.config.save()?;
                self.pipeline
                    .update_settings(self.config.automation.clone())
                    .await;
                println!("Automation mode set to {}", mode);
            }

            AppAction::Activity(limit) => {
                for entry in self.repository.recent_activity(limit).await? {
                    println!(
                        "{}  {:<24} {}",
                        entry.at.format("%Y-%m-%d %H:%M:%S"),
                        entry.kind.as_str(),
                        entry.message
                    );
                }
            }
        }
        Ok(())
    }

    async fn run_daemon(&mut self) -> Result<()> {
        let pid = std::process::id();
        self.repository.acquire_daemon_lock(pid).await?;

        let mut scheduler = AutomationScheduler::new(self.pipeline.clone());
        scheduler.apply(&self.config.automation);
        println!(
            "Running in {} mode, press Ctrl+C to stop",
            self.config.automation.mode
        );

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        let mut config_poll = tokio::time::interval(CONFIG_POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(event) = self.events_rx.recv() => {
                    let is_activity = matches!(event, PipelineEvent::Activity(_));
                    self.handle_event(event).await;
                    if is_activity {
                        if let Err(e) = self.save_state().await {
                            tracing::error!("Failed to save state: {}", e);
                        }
                    }
                }
                _ = config_poll.tick() => {
                    if let Err(e) = self.repository.refresh_daemon_lock(pid).await {
                        tracing::error!("Failed to refresh daemon lock: {}", e);
                    }
                    self.reload_config(&mut scheduler).await;
                }
            }
        }

        scheduler.shutdown();
        if let Err(e) = self.save_state().await {
            tracing::error!("Failed to save state: {}", e);
        }
        self.repository.release_daemon_lock(pid).await?;
        println!("Stopped");
        Ok(())
    }

    /// Pick up settings edited in the config file while the daemon runs.
    async fn reload_config(&mut self, scheduler: &mut AutomationScheduler) {
        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config: {}", e);
                return;
            }
        };
        if config == self.config {
            return;
        }

        tracing::info!("Configuration changed, applying new settings");
        if config.automation.gemini_api_key != self.config.automation.gemini_api_key
            || config.gemini_model != self.config.gemini_model
        {
            self.pipeline.set_generator(build_generator(&config));
        }
        if config.publisher != self.config.publisher || config.db_path != self.config.db_path {
            tracing::warn!("Publisher or database settings changed, restart to apply them");
        }
        self.pipeline
            .update_settings(config.automation.clone())
            .await;
        scheduler.apply(&config.automation);
        self.config = config;
    }

    async fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event).await;
        }
    }

    async fn handle_event(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Notice(notice) => print_notice(&notice),
            PipelineEvent::Activity(entry) => {
                if let Err(e) = self.repository.append_activity(&entry).await {
                    tracing::error!("Failed to record activity: {}", e);
                }
            }
        }
    }

    async fn save_state(&mut self) -> Result<()> {
        let current = self.pipeline.snapshot().await;
        self.repository.save_state(&self.saved, &current).await?;
        self.saved = current;
        Ok(())
    }

    async fn print_overview(&self) {
        let state = self.pipeline.snapshot().await;
        let settings = self.pipeline.settings().await;

        println!(
            "Mode: {}  |  Images: {}  |  Auto-publish: {}  |  Style guide: {}",
            settings.mode,
            settings.image_source.display_name(),
            if settings.auto_publish { "on" } else { "off" },
            if state.style_guide.is_some() { "ready" } else { "missing" }
        );

        println!("\nIdeas ({})", state.ideas.active().len());
        for idea in state.ideas.active() {
            println!("{:>15}  {:<14} {}", idea.id, idea.source.as_str(), idea.title);
        }
        if !state.ideas.archived().is_empty() {
            println!("  ({} archived)", state.ideas.archived().len());
        }

        let (published, drafts): (Vec<&Draft>, Vec<&Draft>) =
            state.drafts.iter().partition(|d| d.is_published());

        println!("\nDrafts ({})", drafts.len());
        for draft in drafts {
            let scheduled = match draft.scheduled_for {
                Some(at) if draft.is_scheduled() => {
                    format!("  [scheduled {}]", at.format("%Y-%m-%d %H:%M"))
                }
                _ => String::new(),
            };
            println!("{:>15}  {}{}", draft.id, draft.title, scheduled);
        }

        println!("\nPublished ({})", published.len());
        for post in published {
            println!(
                "{:>15}  {}  {}",
                post.id,
                post.title,
                post.url.as_deref().unwrap_or_default()
            );
        }
    }
}

fn print_notice(notice: &Notification) {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    println!("[{}] {}", tag, notice.message);
}

fn print_draft(draft: &Draft) {
    println!("Draft {}: {}", draft.id, draft.title);
    println!("  Meta title:       {}", draft.meta_title);
    println!("  Meta description: {}", draft.meta_description);
    println!("  Keywords:         {}", draft.focus_keywords.join(", "));
    println!(
        "  Featured image:   {} ({} bytes encoded)",
        draft.featured_image.mime_type,
        draft.featured_image.data.len()
    );
}

fn print_freshness(draft_id: i64, report: &FreshnessReport) {
    let verdict = if report.needs_update {
        "needs an update"
    } else {
        "up to date"
    };
    println!("  [{}] score {}/100, {}", draft_id, report.score, verdict);
    for suggestion in &report.suggestions {
        println!("    - {}", suggestion);
    }
}
