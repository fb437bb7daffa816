use saguaro_common::{ErrorCategory, SaguaroError};
use saguaro_session::SessionError;
use thiserror::Error;

/// Errors that can occur during embedding operations
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Error from the session driving the model
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The model was not loaded with embedding extraction enabled
    #[error("Embeddings are disabled for this model")]
    EmbeddingsDisabled,

    /// Input text was empty
    #[error("Cannot embed empty text")]
    EmptyText,

    /// Input text exceeded the configured sequence limit
    #[error("Text too long: {length} tokens exceeds the limit of {max}")]
    TextTooLong { length: usize, max: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EmbeddingError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }
}

impl SaguaroError for EmbeddingError {
    fn category(&self) -> ErrorCategory {
        match self {
            EmbeddingError::Session(session_error) => session_error.category(),
            EmbeddingError::EmbeddingsDisabled => ErrorCategory::User,
            EmbeddingError::EmptyText => ErrorCategory::User,
            EmbeddingError::TextTooLong { .. } => ErrorCategory::User,
            EmbeddingError::Configuration(_) => ErrorCategory::User,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            EmbeddingError::Session(_) => "EMBEDDING_SESSION",
            EmbeddingError::EmbeddingsDisabled => "EMBEDDING_DISABLED",
            EmbeddingError::EmptyText => "EMBEDDING_EMPTY_TEXT",
            EmbeddingError::TextTooLong { .. } => "EMBEDDING_TEXT_TOO_LONG",
            EmbeddingError::Configuration(_) => "EMBEDDING_CONFIGURATION",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            EmbeddingError::Session(session_error) => {
                format!("🔗 {}", session_error.user_friendly_message())
            }
            EmbeddingError::EmbeddingsDisabled => {
                "🚫 Embeddings Disabled\n💡 Load the model with `embedding: true` in its ModelConfig to enable embedding extraction.".to_string()
            }
            EmbeddingError::EmptyText => {
                "📝 Empty Text\n💡 Provide non-empty text to embed.".to_string()
            }
            EmbeddingError::TextTooLong { length, max } => {
                format!("📏 Text Too Long: {} tokens exceeds the limit of {}\n💡 Shorten the input or raise max_sequence_length.", length, max)
            }
            EmbeddingError::Configuration(msg) => {
                format!("⚙️ Configuration Error: {}\n💡 Check embedding configuration settings and ensure all required values are provided.", msg)
            }
        }
    }
}
