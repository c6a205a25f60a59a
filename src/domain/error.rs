use thiserror::Error;

pub const MSG_CAPTURE_UNAVAILABLE: &str =
    "Failed to start recording. Please check microphone permissions.";
pub const MSG_NO_SPEECH: &str = "No speech detected. Please try again.";
pub const MSG_PROCESSING_FAILED: &str = "Failed to process voice input. Please try again.";
pub const MSG_SYNTHESIS_FAILED: &str = "Failed to generate speech. Please try again.";
pub const MSG_PLAYBACK_FAILED: &str = "Failed to play audio response.";

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Capture device unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Ingestion failed at record {record}: {reason}")]
    Ingestion { record: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::CaptureUnavailable(msg.into())
    }

    pub fn transcription(msg: impl Into<String>) -> Self {
        Self::Transcription(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingService(msg.into())
    }

    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }

    pub fn ingestion(record: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Ingestion {
            record: record.into(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::StorageError(_))
    }

    pub fn is_capture_unavailable(&self) -> bool {
        matches!(self, Self::CaptureUnavailable(_))
    }

    /// The single message shown to the user when this error ends a conversation turn.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::CaptureUnavailable(_) => MSG_CAPTURE_UNAVAILABLE,
            Self::Synthesis(_) => MSG_SYNTHESIS_FAILED,
            Self::Playback(_) => MSG_PLAYBACK_FAILED,
            _ => MSG_PROCESSING_FAILED,
        }
    }
}
