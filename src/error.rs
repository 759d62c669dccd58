use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} API key is not configured")]
    MissingApiKey(String),

    #[error("No style guide yet, analyze the site style first")]
    MissingStyleGuide,

    #[error("An idea or draft titled \"{0}\" already exists")]
    DuplicateTitle(String),

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Idea {0} not found")]
    IdeaNotFound(i64),

    #[error("Idea {0} is already being drafted")]
    IdeaBusy(i64),

    #[error("Draft {0} not found")]
    DraftNotFound(i64),

    #[error("Draft {0} is already published")]
    AlreadyPublished(i64),

    #[error("Draft {0} is not published yet")]
    NotPublished(i64),

    #[error("Draft {0} is already being published")]
    PublishInProgress(i64),

    #[error("Gemini API error: {0}")]
    GeminiApi(String),

    #[error("Malformed AI response: {0}")]
    MalformedResponse(String),

    #[error("Image provider error: {0}")]
    ImageProvider(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("A content-agent daemon (pid {0}) is using the database, stop it or change settings with --set-mode")]
    DaemonRunning(u32),

    #[error("Usage: {0}")]
    Usage(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Errors caused by missing setup rather than a failed call. These are
    /// surfaced as warnings and never reach the network.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AppError::Config(_) | AppError::MissingApiKey(_) | AppError::MissingStyleGuide
        )
    }

    /// Rejected input or a state conflict the user can fix.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::DuplicateTitle(_)
                | AppError::EmptyTitle
                | AppError::IdeaNotFound(_)
                | AppError::IdeaBusy(_)
                | AppError::DraftNotFound(_)
                | AppError::AlreadyPublished(_)
                | AppError::NotPublished(_)
                | AppError::PublishInProgress(_)
                | AppError::Usage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
