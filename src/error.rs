//! Error types for Sophia.

use crate::pipeline::Stage;
use thiserror::Error;

/// Library-level error type for Sophia operations.
#[derive(Error, Debug)]
pub enum SophiaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Video source error: {0}")]
    VideoSource(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Summary generation failed: {0}")]
    Summary(String),

    #[error("Could not save file: {0}")]
    LocalSave(String),

    #[error("Notion error: {0}")]
    Notion(String),

    #[error("Usage ledger error: {0}")]
    Usage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Sophia operations.
pub type Result<T> = std::result::Result<T, SophiaError>;

/// A precondition that failed before any external call was made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "Invalid YouTube URL: '{0}'. Expected youtube.com/watch?v=..., youtu.be/... or youtube.com/shorts/..."
    )]
    InvalidVideoReference(String),

    #[error("Missing transcription API key. Set GROQ_API_KEY or credentials.groq_api_key in the config file.")]
    MissingTranscriptionKey,

    #[error("Missing summary API key. Set ANTHROPIC_API_KEY or credentials.anthropic_api_key in the config file.")]
    MissingSummaryKey,
}

/// Classified outcome of a failed pipeline run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Could not fetch video info: {0}")]
    MetadataFetchFailed(String),

    #[error("Audio download failed: {0}")]
    AudioDownloadFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Summary generation failed: {0}")]
    SummarizationFailed(String),

    #[error("Could not save Markdown file: {0}")]
    LocalSaveFailed(String),

    #[error("Could not send to Notion: {0}")]
    NotePublishFailed(String),

    #[error("Run cancelled before {0}")]
    Cancelled(Stage),

    #[error("Unexpected pipeline error: {0}")]
    Unknown(String),

    #[error("A run is already in progress")]
    RunAlreadyInProgress,
}

impl PipelineError {
    /// Whether this error aborts the run. Only Notion publishing is best-effort.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::NotePublishFailed(_))
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::MetadataFetchFailed(_) => "metadata_fetch_failed",
            PipelineError::AudioDownloadFailed(_) => "audio_download_failed",
            PipelineError::TranscriptionFailed(_) => "transcription_failed",
            PipelineError::SummarizationFailed(_) => "summarization_failed",
            PipelineError::LocalSaveFailed(_) => "local_save_failed",
            PipelineError::NotePublishFailed(_) => "note_publish_failed",
            PipelineError::Cancelled(_) => "cancelled",
            PipelineError::Unknown(_) => "unknown",
            PipelineError::RunAlreadyInProgress => "run_already_in_progress",
        }
    }
}
