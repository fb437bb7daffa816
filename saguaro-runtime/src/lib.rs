//! # Saguaro Runtime
//!
//! Contracts between the session engine and an underlying model runtime.
//!
//! The session engine never touches tensors, logits, or model files
//! directly. Everything it needs from an inference backend is expressed
//! through the [`ModelRuntime`] and [`TokenSampler`] traits, so the same
//! engine drives a real backend in production and [`ScriptedRuntime`]
//! in tests.
//!
//! # Architecture
//!
//! - [`ModelRuntime`] - decode, tokenization, KV-cache surgery, embeddings
//! - [`TokenSampler`] - stateful token selection bound to one session
//! - [`RuntimeLoader`] - constructs a runtime from a [`ModelConfig`]
//! - [`ScriptedRuntime`] - fixture-backed test double with a byte-level
//!   vocabulary

pub mod detection;
pub mod error;
pub mod sampling;
pub mod scripted;
pub mod types;

pub use detection::detect_model_file;
pub use error::RuntimeError;
pub use sampling::SamplingParams;
pub use scripted::{ScriptedFixture, ScriptedLoader, ScriptedRuntime};
pub use types::{
    ModelConfig, ModelMetadata, ModelSource, PoolingMode, SampledToken, Token, TokenProb,
};

use tokio_util::sync::CancellationToken;

/// Handle to a loaded model runtime.
///
/// Implementations own the model and its inference context exclusively;
/// the session engine serializes all access. Positions are absolute
/// sequence positions starting at zero.
pub trait ModelRuntime: Send {
    /// Context window size in tokens
    fn context_size(&self) -> usize;

    /// Number of entries in the vocabulary
    fn vocab_size(&self) -> usize;

    /// Beginning-of-sequence token
    fn bos_token(&self) -> Token;

    /// End-of-sequence token
    fn eos_token(&self) -> Token;

    /// Whether the token ends generation (EOS or other end-of-generation markers)
    fn is_eog_token(&self, token: Token) -> bool;

    /// Width of embedding vectors produced by this model
    fn embedding_width(&self) -> usize;

    /// Whether the runtime was loaded with embedding extraction enabled
    fn embeddings_enabled(&self) -> bool;

    /// Pooling strategy the model applies to embeddings
    fn pooling(&self) -> PoolingMode;

    /// Tokenize text. `add_bos` prepends the BOS token; `parse_special`
    /// lets special-token text in the input map to special tokens.
    fn tokenize(
        &self,
        text: &str,
        add_bos: bool,
        parse_special: bool,
    ) -> Result<Vec<Token>, RuntimeError>;

    /// Byte piece for a single token. May be a partial UTF-8 sequence.
    fn token_to_bytes(&self, token: Token) -> Vec<u8>;

    /// Evaluate `tokens` at absolute positions `n_past..n_past + tokens.len()`.
    fn decode(&mut self, tokens: &[Token], n_past: usize) -> Result<(), RuntimeError>;

    /// Drop cache entries in `[start, end)`; `end = None` means to the end.
    fn cache_remove(&mut self, start: usize, end: Option<usize>);

    /// Shift cache entry positions in `[start, end)` by `delta`.
    fn cache_shift(&mut self, start: usize, end: usize, delta: isize);

    /// Unpooled embeddings for the last evaluated token, if available
    fn embeddings(&self) -> Option<Vec<f32>>;

    /// Pooled embeddings for sequence 0, if available
    fn embeddings_pooled(&self) -> Option<Vec<f32>>;

    /// Build a fresh sampler for the given parameters
    fn new_sampler(&self, params: &SamplingParams) -> Result<Box<dyn TokenSampler>, RuntimeError>;

    /// Reset performance timers ahead of a completion run
    fn reset_timings(&mut self);
}

/// Stateful token selection for one generation session.
///
/// A sampler accumulates history via [`accept`](TokenSampler::accept) and
/// must be reset (or replaced) when the session rewinds.
pub trait TokenSampler: Send {
    /// Sample the next token from the current logits, with candidate
    /// probabilities for callers that want them.
    fn sample(&mut self) -> SampledToken;

    /// Record a token in the sampler's history. `apply_grammar` controls
    /// whether grammar state advances (prompt tokens are accepted without it).
    fn accept(&mut self, token: Token, apply_grammar: bool);

    /// Clear accumulated history
    fn reset(&mut self);
}

/// Constructs a [`ModelRuntime`] from configuration.
pub trait RuntimeLoader: Send + Sync {
    /// Load a model. Observes `cancel` during the load so a caller can
    /// abandon a slow load; returns [`RuntimeError::LoadInterrupted`] when
    /// cancelled.
    fn load(
        &self,
        config: &ModelConfig,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn ModelRuntime>, RuntimeError>;
}
