//! Embedding extraction over a session
//!
//! Extraction reuses the session's normal prompt-evaluation machinery with
//! generation disabled: the text runs through `load_prompt` and a single
//! completion step with `n_predict = 0`, which evaluates every prompt token
//! and leaves the runtime holding the sequence embedding.

use std::time::Instant;

use saguaro_common::ValidatedConfig;
use saguaro_session::{Session, SessionParams};
use tracing::{debug, info};

use crate::error::EmbeddingError;
use crate::types::{EmbeddingConfig, EmbeddingResult};

/// Extracts embedding vectors from text using a loaded session.
///
/// Single-threaded; each call rewinds the session and evaluates one text.
pub struct EmbeddingExtractor {
    session: Session,
    config: EmbeddingConfig,
}

impl EmbeddingExtractor {
    /// Wrap a session for embedding extraction.
    ///
    /// The session's model must have been loaded with embedding mode
    /// enabled; fails with [`EmbeddingError::EmbeddingsDisabled`] otherwise.
    pub fn new(session: Session, config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        if !session.embeddings_enabled() {
            return Err(EmbeddingError::EmbeddingsDisabled);
        }

        Ok(Self { session, config })
    }

    /// Embed a single text, returning the vector with metadata.
    pub fn embed_text(&mut self, text: &str) -> Result<EmbeddingResult, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let start = Instant::now();

        // BOS is added during prompt loading, so it counts against the limit
        let token_count = self.session.tokenize(text)?.len() + 1;
        let max = self
            .config
            .max_sequence_length
            .unwrap_or_else(|| self.session.context_size());
        if token_count > max {
            return Err(EmbeddingError::TextTooLong {
                length: token_count,
                max,
            });
        }

        self.evaluate(text)?;

        let mut embedding = self.session.embedding();
        self.config.normalize.apply(&mut embedding);

        let sequence_length = self.session.num_prompt_tokens();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if self.config.debug {
            debug!(
                dims = embedding.len(),
                tokens = sequence_length,
                ms = elapsed_ms,
                "extracted embedding"
            );
        }

        Ok(EmbeddingResult::new(
            text.to_string(),
            embedding,
            sequence_length,
            elapsed_ms,
        ))
    }

    /// Embed a batch of texts sequentially.
    ///
    /// Fails on the first text that cannot be embedded.
    pub fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<EmbeddingResult>, EmbeddingError> {
        info!(count = texts.len(), "embedding batch");
        texts.iter().map(|text| self.embed_text(text)).collect()
    }

    /// Run the text through the evaluation path without generating
    fn evaluate(&mut self, text: &str) -> Result<(), EmbeddingError> {
        self.session.rewind();
        self.session.set_params(SessionParams {
            n_predict: 0,
            ..Default::default()
        })?;

        self.session.init_sampling()?;
        self.session.begin_completion()?;
        let result = self
            .session
            .load_prompt(text)
            .and_then(|_| self.session.do_completion().map(|_| ()));
        self.session.end_completion();

        result?;
        Ok(())
    }

    /// Access the wrapped session
    pub fn session(&self) -> &Session {
        &self.session
    }
}
