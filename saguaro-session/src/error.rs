//! Session error types

use saguaro_common::{ErrorCategory, SaguaroError};
use saguaro_runtime::RuntimeError;
use thiserror::Error;

/// Errors from session lifecycle and completion operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Sampler is not initialized; call init_sampling first")]
    SamplerNotInitialized,

    #[error("Completion already in progress")]
    CompletionInProgress,

    #[error("Context size {n_ctx} too small for keep {n_keep}")]
    ContextTooSmall { n_ctx: usize, n_keep: usize },

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl SessionError {
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig(message.into())
    }
}

impl SaguaroError for SessionError {
    fn category(&self) -> ErrorCategory {
        match self {
            SessionError::InvalidConfig(_) => ErrorCategory::User,
            SessionError::SamplerNotInitialized => ErrorCategory::User,
            SessionError::CompletionInProgress => ErrorCategory::User,
            SessionError::ContextTooSmall { .. } => ErrorCategory::User,
            SessionError::Runtime(e) => e.category(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SessionError::InvalidConfig(_) => "SESSION_INVALID_CONFIG",
            SessionError::SamplerNotInitialized => "SESSION_SAMPLER_NOT_INITIALIZED",
            SessionError::CompletionInProgress => "SESSION_COMPLETION_IN_PROGRESS",
            SessionError::ContextTooSmall { .. } => "SESSION_CONTEXT_TOO_SMALL",
            SessionError::Runtime(e) => e.error_code(),
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            SessionError::CompletionInProgress => {
                "Completion already in progress\n💡 Wait for the current completion to finish or interrupt it first.".to_string()
            }
            SessionError::ContextTooSmall { n_ctx, n_keep } => {
                format!(
                    "Context size {} too small for keep {}\n💡 Increase the context size or reduce n_keep.",
                    n_ctx, n_keep
                )
            }
            SessionError::Runtime(e) => e.user_friendly_message(),
            other => format!("{}", other),
        }
    }
}
