//! Periodic automation. Each mode maps to a set of named timers; applying
//! new settings cancels the timers that no longer fit and installs the
//! missing ones.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::models::{ActivityKind, AutomationMode, AutomationSettings};
use crate::pipeline::PipelineOrchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    StyleRefresh,
    IdeaGeneration,
    FullCycle,
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::StyleRefresh => "style-refresh",
            TimerKind::IdeaGeneration => "idea-generation",
            TimerKind::FullCycle => "full-cycle",
        }
    }

    /// Style analysis runs as soon as it is installed; the rest wait one period.
    fn fires_immediately(&self) -> bool {
        matches!(self, TimerKind::StyleRefresh)
    }
}

struct InstalledTimer {
    period: Duration,
    handle: JoinHandle<()>,
}

pub struct AutomationScheduler {
    pipeline: Arc<PipelineOrchestrator>,
    timers: BTreeMap<TimerKind, InstalledTimer>,
    mode: Option<AutomationMode>,
}

/// Timers a given configuration calls for, with their periods.
pub fn desired_timers(settings: &AutomationSettings) -> BTreeMap<TimerKind, Duration> {
    let mut timers = BTreeMap::new();
    if settings.has_gemini_key() {
        timers.insert(TimerKind::StyleRefresh, settings.style_refresh_period());
    }
    match settings.mode {
        AutomationMode::Manual => {}
        AutomationMode::SemiAutomatic => {
            timers.insert(TimerKind::IdeaGeneration, settings.idea_period());
        }
        AutomationMode::FullAutomatic => {
            timers.insert(TimerKind::FullCycle, settings.full_cycle_period());
        }
    }
    timers
}

impl AutomationScheduler {
    pub fn new(pipeline: Arc<PipelineOrchestrator>) -> Self {
        Self {
            pipeline,
            timers: BTreeMap::new(),
            mode: None,
        }
    }

    pub fn apply(&mut self, settings: &AutomationSettings) {
        let desired = desired_timers(settings);

        self.timers.retain(|kind, timer| {
            let keep = desired.get(kind) == Some(&timer.period);
            if !keep {
                timer.handle.abort();
                tracing::debug!("Cancelled {} timer", kind.as_str());
            }
            keep
        });

        for (kind, period) in desired {
            if self.timers.contains_key(&kind) {
                continue;
            }
            tracing::info!("Scheduling {} every {:?}", kind.as_str(), period);
            let handle = spawn_timer(self.pipeline.clone(), kind, period);
            self.timers.insert(kind, InstalledTimer { period, handle });
        }

        self.announce_mode(settings);
    }

    fn announce_mode(&mut self, settings: &AutomationSettings) {
        let mode = settings.mode;
        let previous = self.mode.replace(mode);
        if previous == Some(mode) {
            return;
        }

        let events = self.pipeline.events();
        if let Some(previous) = previous {
            events.activity(
                ActivityKind::AutomationModeChanged,
                format!("Automation mode changed from {} to {}", previous, mode),
            );
            if previous == AutomationMode::SemiAutomatic {
                events.info("Semi-automatic mode off, idea generation stopped");
            }
        }
        if mode == AutomationMode::SemiAutomatic {
            events.info(format!(
                "Semi-automatic mode on, new ideas every {} minutes",
                settings.idea_period().as_secs() / 60
            ));
        }
    }

    pub fn active_timers(&self) -> Vec<TimerKind> {
        self.timers.keys().copied().collect()
    }

    pub fn shutdown(&mut self) {
        for (kind, timer) in std::mem::take(&mut self.timers) {
            timer.handle.abort();
            tracing::debug!("Stopped {} timer", kind.as_str());
        }
    }
}

impl Drop for AutomationScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_timer(pipeline: Arc<PipelineOrchestrator>, kind: TimerKind, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = if kind.fires_immediately() {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut ticker = time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            // Detached so that cancelling the timer leaves a running trigger alone.
            let pipeline = pipeline.clone();
            tokio::spawn(async move { run_trigger(&pipeline, kind).await });
        }
    })
}

async fn run_trigger(pipeline: &PipelineOrchestrator, kind: TimerKind) {
    tracing::debug!("{} trigger fired", kind.as_str());
    let outcome = match kind {
        TimerKind::StyleRefresh => pipeline.refresh_style_guide().await.map(|_| ()),
        TimerKind::IdeaGeneration => {
            let count = pipeline.settings().await.ideas_per_run;
            pipeline.generate_ideas(count, true, None).await.map(|_| ())
        }
        TimerKind::FullCycle => pipeline.run_full_cycle().await.map(|_| ()),
    };
    if let Err(e) = outcome {
        tracing::warn!("{} trigger failed: {}", kind.as_str(), e);
    }
}
