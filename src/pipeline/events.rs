use tokio::sync::mpsc;

use crate::models::{ActivityEntry, ActivityKind, NoticeLevel, Notification};

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Notice(Notification),
    Activity(ActivityEntry),
}

/// Fan-out point for notices and activity. Sending never blocks the
/// pipeline; a dropped receiver just means nobody is listening.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Error => tracing::error!("{}", message),
            NoticeLevel::Warning => tracing::warn!("{}", message),
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{}", message),
        }
        self.send(PipelineEvent::Notice(Notification { level, message }));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Success, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Error, message);
    }

    pub fn activity(&self, kind: ActivityKind, message: impl Into<String>) {
        let entry = ActivityEntry::new(kind, message);
        tracing::debug!("activity {}: {}", kind.as_str(), entry.message);
        self.send(PipelineEvent::Activity(entry));
    }

    fn send(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
