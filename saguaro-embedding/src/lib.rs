//! # Saguaro Embedding
//!
//! Text embedding extraction on top of the session engine.
//!
//! An [`EmbeddingExtractor`] drives a [`Session`](saguaro_session::Session)
//! through its ordinary prompt-evaluation path with generation disabled,
//! then reads the embedding vector the runtime produced for the sequence.
//! Results carry an MD5 hash of the input text for deduplication and the
//! processing time for reporting.
//!
//! ```no_run
//! use saguaro_embedding::{EmbeddingConfig, EmbeddingExtractor};
//! use saguaro_runtime::{ModelConfig, SamplingParams, ScriptedFixture, ScriptedLoader};
//! use saguaro_session::{Session, SessionParams};
//! use tokio_util::sync::CancellationToken;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = ScriptedLoader::new(ScriptedFixture {
//!     context_size: 512,
//!     script: vec![],
//!     embedding: Some(vec![0.0; 384]),
//! });
//! let config = ModelConfig {
//!     embedding: true,
//!     ..Default::default()
//! };
//! let session = Session::load_model(
//!     &loader,
//!     &config,
//!     SessionParams::default(),
//!     SamplingParams::default(),
//!     &CancellationToken::new(),
//! )?;
//!
//! let mut extractor = EmbeddingExtractor::new(session, EmbeddingConfig::default())?;
//! let result = extractor.embed_text("the saguaro blooms at night")?;
//! println!("{} dims in {}ms", result.dimension(), result.processing_time_ms);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extractor;
pub mod types;

pub use error::EmbeddingError;
pub use extractor::EmbeddingExtractor;
pub use types::{EmbeddingConfig, EmbeddingResult, Normalization};
