//! Session parameters

use saguaro_common::ValidatedConfig;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Maximum number of stop words a session will accept
const MAX_ANTIPROMPTS: usize = 10;

/// Maximum length of a single stop word, in bytes
const MAX_ANTIPROMPT_LEN: usize = 50;

/// Parameters for a generation session.
///
/// `n_keep` and `n_predict` use the conventional sentinel values:
/// `n_keep = -1` keeps the entire prompt on context shift, and
/// `n_predict = -1` generates without a budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionParams {
    /// Maximum tokens per decode call
    pub n_batch: usize,
    /// Tokens preserved at the start of the window on context shift;
    /// -1 means the whole prompt
    pub n_keep: i32,
    /// Token generation budget; -1 is unbounded
    pub n_predict: i64,
    /// Stop words ending generation when they appear in the output
    pub antiprompts: Vec<String>,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            n_batch: 512,
            n_keep: 0,
            n_predict: -1,
            antiprompts: Vec::new(),
        }
    }
}

impl SessionParams {
    /// Validate the session parameters
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.n_batch == 0 {
            return Err(SessionError::invalid_config(
                "n_batch must be greater than 0",
            ));
        }

        if self.n_predict < -1 {
            return Err(SessionError::invalid_config(format!(
                "n_predict must be -1 or non-negative, got {}",
                self.n_predict
            )));
        }

        if self.n_keep < -1 {
            return Err(SessionError::invalid_config(format!(
                "n_keep must be -1 or non-negative, got {}",
                self.n_keep
            )));
        }

        if self.antiprompts.len() > MAX_ANTIPROMPTS {
            return Err(SessionError::invalid_config(format!(
                "Too many stop words (max {})",
                MAX_ANTIPROMPTS
            )));
        }

        for word in &self.antiprompts {
            if word.is_empty() {
                return Err(SessionError::invalid_config("Stop word cannot be empty"));
            }
            if word.len() > MAX_ANTIPROMPT_LEN {
                return Err(SessionError::invalid_config(format!(
                    "Stop word too long (max {} bytes): {}",
                    MAX_ANTIPROMPT_LEN, word
                )));
            }
        }

        Ok(())
    }
}

impl ValidatedConfig for SessionParams {
    type Error = SessionError;

    fn validate(&self) -> Result<(), Self::Error> {
        SessionParams::validate(self)
    }

    fn description() -> &'static str {
        "Generation session parameters: batching, window keep, prediction budget, and stop words"
    }
}
