//! Shared error types and traits for consistent error handling across crates

use std::fmt::Debug;
use thiserror::Error;

/// Category of error for consistent handling and routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// User input or configuration error - can be fixed by user
    User,
    /// System resource or environmental error - may be temporary
    System,
    /// Internal logic error - indicates a bug
    Internal,
}

/// Trait for all errors in the saguaro ecosystem
///
/// This trait provides a consistent interface for error handling
/// and allows for better error categorization and user experience.
pub trait SaguaroError: std::error::Error + Send + Sync + Debug {
    /// Get the error category for proper handling
    fn category(&self) -> ErrorCategory;

    /// Get a unique error code for this error type
    fn error_code(&self) -> &'static str;

    /// Check if this is a user-correctable error
    fn is_user_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::User)
    }

    /// Check if this error is potentially retriable
    fn is_retriable(&self) -> bool {
        matches!(self.category(), ErrorCategory::System)
    }

    /// Get a user-friendly error message with actionable advice
    fn user_friendly_message(&self) -> String {
        format!("{}", self)
    }

    /// Get suggested recovery actions for this error
    fn recovery_suggestions(&self) -> Vec<String> {
        match self.category() {
            ErrorCategory::User => vec![
                "Check your input parameters".to_string(),
                "Review configuration settings".to_string(),
            ],
            ErrorCategory::System => vec![
                "Check system resources (memory, disk space)".to_string(),
                "Retry the operation".to_string(),
            ],
            ErrorCategory::Internal => vec![
                "Report this as a bug".to_string(),
                "Include error details and reproduction steps".to_string(),
            ],
        }
    }
}

/// Base error type that can be used by any crate
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Resource error: {message}")]
    Resource { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SaguaroError for CommonError {
    fn category(&self) -> ErrorCategory {
        match self {
            CommonError::Configuration { .. } => ErrorCategory::User,
            CommonError::Validation { .. } => ErrorCategory::User,
            CommonError::Resource { .. } => ErrorCategory::System,
            CommonError::Internal { .. } => ErrorCategory::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CommonError::Configuration { .. } => "COMMON_CONFIG",
            CommonError::Validation { .. } => "COMMON_VALIDATION",
            CommonError::Resource { .. } => "COMMON_RESOURCE",
            CommonError::Internal { .. } => "COMMON_INTERNAL",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CommonError::Configuration { message } => {
                format!("Configuration Error: {}\n💡 Please check your configuration settings and ensure all required values are provided.", message)
            }
            CommonError::Validation { message } => {
                format!(
                    "Validation Error: {}\n💡 Please verify your input parameters and try again.",
                    message
                )
            }
            CommonError::Resource { message } => {
                format!("Resource Error: {}\n💡 Check available system resources (memory, disk space, file permissions).", message)
            }
            CommonError::Internal { message } => {
                format!("Internal Error: {}\n💡 This appears to be a bug. Please report this issue with the error details.", message)
            }
        }
    }
}

/// Result type alias for operations that can return saguaro errors
pub type SaguaroResult<T, E = CommonError> = Result<T, E>;

/// Convenience functions for creating common errors
impl CommonError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn resource<S: Into<String>>(message: S) -> Self {
        Self::Resource {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
