//! # Saguaro Common
//!
//! Shared types, traits, and utilities for the saguaro workspace.
//! This crate provides common abstractions to ensure consistency across
//! all components in the saguaro inference-session ecosystem.

pub mod config;
pub mod error;
pub mod logging;

// Re-export main traits for convenience
pub use config::ValidatedConfig;
pub use error::{CommonError, ErrorCategory, SaguaroError};
pub use logging::init_tracing;
