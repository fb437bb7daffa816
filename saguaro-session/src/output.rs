//! Completion output types

use saguaro_runtime::{Token, TokenProb};
use serde::{Deserialize, Serialize};

/// Why a completion finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinishReason {
    /// The model emitted an end-of-generation token
    Eos,
    /// A stop word appeared in the output
    StopWord(String),
    /// The token budget ran out
    Limit,
    /// The completion was interrupted
    Interrupted,
}

/// One generation step: the sampled token, its byte piece, and candidate
/// probabilities when requested.
#[derive(Debug, Clone)]
pub struct CompletionStep {
    /// The sampled token; `None` when the step produced nothing (decode
    /// interrupted, or the context cannot make progress)
    pub token: Option<Token>,
    /// Byte piece of the sampled token
    pub bytes: Vec<u8>,
    /// Candidate probabilities, most probable first; empty unless
    /// `n_probs > 0`
    pub probs: Vec<TokenProb>,
}

impl CompletionStep {
    pub(crate) fn empty() -> Self {
        Self {
            token: None,
            bytes: Vec::new(),
            probs: Vec::new(),
        }
    }
}

/// Final result of a completion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutcome {
    /// The generated text, stop word excluded
    pub text: String,
    /// Tokens produced by sampling
    pub tokens_predicted: usize,
    /// Prompt tokens after any truncation
    pub tokens_evaluated: usize,
    /// Whether the prompt was truncated to fit the context
    pub truncated: bool,
    /// Whether generation ended on an end-of-generation token
    pub stopped_eos: bool,
    /// Whether generation ended on a stop word
    pub stopped_word: bool,
    /// Whether generation ended by exhausting the token budget
    pub stopped_limit: bool,
    /// The stop word that ended generation, when `stopped_word`
    pub stopping_word: String,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

/// A chunk of streamed completion output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Text for this chunk; empty for the final marker chunk
    pub text: String,
    /// True on the final chunk of a stream
    pub is_complete: bool,
    /// Tokens predicted so far
    pub token_count: usize,
    /// Set on the final chunk
    pub finish_reason: Option<FinishReason>,
}
