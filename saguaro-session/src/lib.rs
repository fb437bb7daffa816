//! # Saguaro Session
//!
//! The generation session engine. A [`Session`] owns a model runtime and
//! drives autoregressive completion over it: prompt ingestion with
//! common-prefix cache reuse, context-window shifting, stop-string
//! matching, UTF-8-safe streaming, and cooperative interruption.
//!
//! # Usage
//!
//! ```no_run
//! use saguaro_runtime::{ModelConfig, SamplingParams, ScriptedFixture, ScriptedLoader};
//! use saguaro_session::{run_completion, Session, SessionParams};
//! use tokio_util::sync::CancellationToken;
//!
//! # fn main() -> Result<(), saguaro_session::SessionError> {
//! let loader = ScriptedLoader::new(ScriptedFixture {
//!     context_size: 512,
//!     script: vec![104, 105],
//!     embedding: None,
//! });
//! let mut session = Session::load_model(
//!     &loader,
//!     &ModelConfig::default(),
//!     SessionParams::default(),
//!     SamplingParams::default(),
//!     &CancellationToken::new(),
//! )?;
//!
//! let outcome = run_completion(&mut session, "Say hi:", |text| {
//!     print!("{}", text);
//!     true
//! })?;
//! println!("predicted {} tokens", outcome.tokens_predicted);
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod config;
pub mod error;
pub mod output;
pub mod sampler;
pub mod session;
pub mod stopper;
pub mod utf8;
pub mod window;
pub mod worker;

pub use completion::run_completion;
pub use config::SessionParams;
pub use error::SessionError;
pub use output::{CompletionOutcome, CompletionStep, FinishReason, StreamChunk};
pub use session::{Phase, Session, StopKind};
pub use stopper::StopScan;
pub use worker::{CompletionRequest, CompletionWorker, WorkerConfig};
