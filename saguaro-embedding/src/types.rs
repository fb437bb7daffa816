use saguaro_common::ValidatedConfig;
use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;

/// Normalization applied to extracted embedding vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    /// Leave the vector as the model produced it
    None,
    /// Divide by the largest absolute component
    MaxAbsolute,
    /// Scale to unit length
    L2,
}

impl Default for Normalization {
    fn default() -> Self {
        Self::L2
    }
}

impl Normalization {
    /// Apply this normalization to `vector` in place
    pub fn apply(&self, vector: &mut [f32]) {
        match self {
            Self::None => {}
            Self::MaxAbsolute => {
                let max = vector.iter().fold(0.0f32, |acc, x| acc.max(x.abs()));
                if max > 0.0 {
                    for value in vector.iter_mut() {
                        *value /= max;
                    }
                }
            }
            Self::L2 => {
                let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
                if magnitude > 0.0 {
                    for value in vector.iter_mut() {
                        *value /= magnitude;
                    }
                }
            }
        }
    }
}

/// Configuration for embedding operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Normalization applied to every extracted vector
    pub normalize: Normalization,
    /// Maximum tokenized sequence length, including the BOS token.
    /// If None, the model's context size is the limit.
    pub max_sequence_length: Option<usize>,
    /// Enable debug logging
    pub debug: bool,
}

impl ValidatedConfig for EmbeddingConfig {
    type Error = EmbeddingError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.max_sequence_length == Some(0) {
            return Err(EmbeddingError::configuration(
                "max_sequence_length must be greater than 0",
            ));
        }
        Ok(())
    }

    fn description() -> &'static str {
        "Embedding extraction configuration"
    }
}

/// Result of a single text embedding operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResult {
    /// Original text that was embedded
    pub text: String,
    /// MD5 hash of the text for deduplication
    pub text_hash: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Length of the tokenized sequence
    pub sequence_length: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl EmbeddingResult {
    /// Create a new embedding result
    pub fn new(
        text: String,
        embedding: Vec<f32>,
        sequence_length: usize,
        processing_time_ms: u64,
    ) -> Self {
        let text_hash = format!("{:x}", md5::compute(&text));

        Self {
            text,
            text_hash,
            embedding,
            sequence_length,
            processing_time_ms,
        }
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}
