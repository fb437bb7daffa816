//! Core token, model source, and metadata types

use crate::error::RuntimeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Token identifier within a model's vocabulary
pub type Token = i32;

/// A candidate token with its probability after sampling transforms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenProb {
    pub token: Token,
    pub prob: f32,
}

/// Result of a single sampling step
#[derive(Debug, Clone)]
pub struct SampledToken {
    /// The selected token
    pub token: Token,
    /// Candidate distribution at the time of selection, most probable first
    pub candidates: Vec<TokenProb>,
}

/// Pooling strategy a model applies to its embedding output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolingMode {
    /// No pooling; per-token embeddings only
    None,
    /// Mean pooling over the sequence
    Mean,
    /// Embedding of the last token
    Last,
}

/// Source from which a model can be loaded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ModelSource {
    /// Load from the local filesystem
    Local {
        /// Path to the folder containing the model
        folder: PathBuf,
        /// Optional specific filename to load
        filename: Option<String>,
    },
}

impl ModelSource {
    /// Validate that the model source configuration is valid
    pub fn validate(&self) -> Result<(), RuntimeError> {
        match self {
            ModelSource::Local { folder, filename } => {
                if !folder.exists() {
                    return Err(RuntimeError::NotFound(format!(
                        "Local folder does not exist: {}",
                        folder.display()
                    )));
                }

                if !folder.is_dir() {
                    return Err(RuntimeError::InvalidConfig(format!(
                        "Path is not a directory: {}",
                        folder.display()
                    )));
                }

                if let Some(f) = filename {
                    if f.is_empty() {
                        return Err(RuntimeError::InvalidConfig(
                            "Filename cannot be empty".to_string(),
                        ));
                    }
                    if !f.ends_with(".gguf") {
                        return Err(RuntimeError::InvalidConfig(
                            "Model file must have .gguf extension".to_string(),
                        ));
                    }

                    let full_path = folder.join(f);
                    if !full_path.exists() {
                        return Err(RuntimeError::NotFound(format!(
                            "Model file does not exist: {}",
                            full_path.display()
                        )));
                    }

                    if !full_path.is_file() {
                        return Err(RuntimeError::InvalidConfig(format!(
                            "Path is not a file: {}",
                            full_path.display()
                        )));
                    }
                }

                Ok(())
            }
        }
    }
}

/// Configuration for loading a model runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// The source from which to load the model
    pub source: ModelSource,
    /// Context window override; None uses the model's native size
    pub n_ctx: Option<u32>,
    /// Batch size for decode operations
    pub n_batch: u32,
    /// Number of threads for processing
    pub n_threads: i32,
    /// Load with embedding extraction enabled
    pub embedding: bool,
    /// Enable debug output
    pub debug: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::Local {
                folder: PathBuf::from("."),
                filename: None,
            },
            n_ctx: None,
            n_batch: 512,
            n_threads: 4,
            embedding: false,
            debug: false,
        }
    }
}

impl ModelConfig {
    /// Validate the model configuration
    pub fn validate(&self) -> Result<(), RuntimeError> {
        self.source.validate()?;

        if self.n_batch == 0 {
            return Err(RuntimeError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.n_batch > 8192 {
            return Err(RuntimeError::InvalidConfig(
                "Batch size should not exceed 8192 for most models".to_string(),
            ));
        }

        if let Some(n_ctx) = self.n_ctx {
            if n_ctx == 0 {
                return Err(RuntimeError::InvalidConfig(
                    "Context size override must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Metadata about a loaded model
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    /// The filename of the model
    pub filename: String,
    /// Size of the model file in bytes
    pub size_bytes: u64,
    /// Time taken to load the model
    pub load_time: Duration,
    /// Context window size in tokens
    pub context_size: usize,
    /// Vocabulary size
    pub vocab_size: usize,
    /// Embedding vector width
    pub embedding_width: usize,
    /// Pooling strategy
    pub pooling: PoolingMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_source_validation_local() {
        let temp_dir = std::env::temp_dir();

        let source = ModelSource::Local {
            folder: temp_dir.clone(),
            filename: None,
        };
        assert!(source.validate().is_ok());

        let source = ModelSource::Local {
            folder: PathBuf::from("/non/existent/path"),
            filename: None,
        };
        assert!(source.validate().is_err());

        let source = ModelSource::Local {
            folder: temp_dir.clone(),
            filename: Some("".to_string()),
        };
        assert!(source.validate().is_err());

        let source = ModelSource::Local {
            folder: temp_dir,
            filename: Some("model.txt".to_string()),
        };
        assert!(source.validate().is_err());
    }

    #[test]
    fn test_model_config_validation() {
        let mut config = ModelConfig {
            source: ModelSource::Local {
                folder: std::env::temp_dir(),
                filename: None,
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.n_batch = 0;
        assert!(config.validate().is_err());

        config.n_batch = 16384;
        assert!(config.validate().is_err());

        config.n_batch = 512;
        config.n_ctx = Some(0);
        assert!(config.validate().is_err());
    }
}
