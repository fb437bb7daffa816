//! Sampling parameters passed to [`ModelRuntime::new_sampler`](crate::ModelRuntime::new_sampler)

use serde::{Deserialize, Serialize};

use crate::types::Token;

/// Parameters controlling token selection.
///
/// These are consumed when a sampler is built; changing them afterwards
/// has no effect until the sampler is reinitialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Sampling temperature; 0 selects greedily
    pub temperature: f32,
    /// Top-k filtering; 0 disables
    pub top_k: i32,
    /// Nucleus sampling threshold; 1.0 disables
    pub top_p: f32,
    /// Minimum probability relative to the most likely token; 0.0 disables
    pub min_p: f32,
    /// Locally typical sampling; 1.0 disables
    pub typical_p: f32,
    /// Mirostat mode: 0 = disabled, 1 = v1, 2 = v2
    pub mirostat: i32,
    /// Mirostat target entropy
    pub mirostat_tau: f32,
    /// Mirostat learning rate
    pub mirostat_eta: f32,
    /// How many recent tokens repetition penalties consider
    pub penalty_last_n: i32,
    /// Repetition penalty; 1.0 disables
    pub penalty_repeat: f32,
    /// Frequency penalty; 0.0 disables
    pub penalty_freq: f32,
    /// Presence penalty; 0.0 disables
    pub penalty_present: f32,
    /// Optional GBNF grammar constraining output
    pub grammar: String,
    /// Per-token logit adjustments
    pub logit_bias: Vec<(Token, f32)>,
    /// How many candidate probabilities to report per sampled token
    pub n_probs: usize,
    /// RNG seed; -1 derives a seed from the clock at sampler init
    pub seed: i64,
    /// Never sample the EOS token
    pub ignore_eos: bool,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_k: 40,
            top_p: 0.95,
            min_p: 0.05,
            typical_p: 1.0,
            mirostat: 0,
            mirostat_tau: 5.0,
            mirostat_eta: 0.1,
            penalty_last_n: 64,
            penalty_repeat: 1.0,
            penalty_freq: 0.0,
            penalty_present: 0.0,
            grammar: String::new(),
            logit_bias: Vec::new(),
            n_probs: 0,
            seed: -1,
            ignore_eos: false,
        }
    }
}

impl SamplingParams {
    /// Validate the sampling parameters
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }

        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(format!(
                "top_p must be between 0.0 and 1.0, got {}",
                self.top_p
            ));
        }

        if !(0.0..=1.0).contains(&self.min_p) {
            return Err(format!(
                "min_p must be between 0.0 and 1.0, got {}",
                self.min_p
            ));
        }

        if !(0.0..=1.0).contains(&self.typical_p) {
            return Err(format!(
                "typical_p must be between 0.0 and 1.0, got {}",
                self.typical_p
            ));
        }

        if !(0..=2).contains(&self.mirostat) {
            return Err(format!(
                "mirostat must be 0, 1, or 2, got {}",
                self.mirostat
            ));
        }

        if self.penalty_repeat < 0.0 {
            return Err(format!(
                "penalty_repeat must be non-negative, got {}",
                self.penalty_repeat
            ));
        }

        if self.top_k < 0 {
            return Err(format!("top_k must be non-negative, got {}", self.top_k));
        }

        Ok(())
    }

    /// Resolve the effective seed, mapping -1 to a clock-derived value
    pub fn effective_seed(&self) -> u32 {
        if self.seed < 0 {
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.subsec_nanos())
                .unwrap_or(0);
            nanos ^ 0x9e37_79b9
        } else {
            self.seed as u32
        }
    }
}
