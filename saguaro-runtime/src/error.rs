//! Runtime and model loading errors

use saguaro_common::{ErrorCategory, SaguaroError};
use thiserror::Error;

/// Errors from runtime loading, decoding, and tokenization
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Model loading failed: {0}")]
    LoadingFailed(String),

    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Sampler initialization failed: {0}")]
    SamplerInit(String),

    #[error("Model load was interrupted")]
    LoadInterrupted,
}

impl RuntimeError {
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn loading_failed<S: Into<String>>(message: S) -> Self {
        Self::LoadingFailed(message.into())
    }

    pub fn decode_failed<S: Into<String>>(message: S) -> Self {
        Self::DecodeFailed(message.into())
    }

    pub fn tokenization<S: Into<String>>(message: S) -> Self {
        Self::Tokenization(message.into())
    }
}

impl SaguaroError for RuntimeError {
    fn category(&self) -> ErrorCategory {
        match self {
            RuntimeError::NotFound(_) => ErrorCategory::User,
            RuntimeError::InvalidConfig(_) => ErrorCategory::User,
            RuntimeError::LoadingFailed(_) => ErrorCategory::System,
            RuntimeError::DecodeFailed(_) => ErrorCategory::System,
            RuntimeError::Tokenization(_) => ErrorCategory::User,
            RuntimeError::SamplerInit(_) => ErrorCategory::User,
            RuntimeError::LoadInterrupted => ErrorCategory::User,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RuntimeError::NotFound(_) => "RUNTIME_NOT_FOUND",
            RuntimeError::InvalidConfig(_) => "RUNTIME_INVALID_CONFIG",
            RuntimeError::LoadingFailed(_) => "RUNTIME_LOADING_FAILED",
            RuntimeError::DecodeFailed(_) => "RUNTIME_DECODE_FAILED",
            RuntimeError::Tokenization(_) => "RUNTIME_TOKENIZATION",
            RuntimeError::SamplerInit(_) => "RUNTIME_SAMPLER_INIT",
            RuntimeError::LoadInterrupted => "RUNTIME_LOAD_INTERRUPTED",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RuntimeError::NotFound(msg) => {
                format!("Model Not Found: {}\n💡 Check the model folder path and filename.", msg)
            }
            RuntimeError::InvalidConfig(msg) => {
                format!("Invalid Configuration: {}\n💡 Review the model configuration values.", msg)
            }
            RuntimeError::LoadingFailed(msg) => {
                format!("Model Loading Failed: {}\n💡 Verify the model file is a valid GGUF file and there is enough memory.", msg)
            }
            other => format!("{}", other),
        }
    }
}
