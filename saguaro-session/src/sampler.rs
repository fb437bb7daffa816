//! Sampler adapter

use saguaro_runtime::{Token, TokenProb, TokenSampler};
use tracing::trace;

/// Owns the runtime's sampler and applies session-level policy to its
/// output: candidate lists are clipped to `n_probs` entries and to tokens
/// inside the vocabulary.
pub struct SamplerAdapter {
    inner: Box<dyn TokenSampler>,
    n_probs: usize,
}

impl SamplerAdapter {
    pub fn new(inner: Box<dyn TokenSampler>, n_probs: usize) -> Self {
        Self { inner, n_probs }
    }

    /// Sample the next token, returning it with its clipped candidate list
    pub fn sample(&mut self, vocab_size: usize) -> (Token, Vec<TokenProb>) {
        let sampled = self.inner.sample();

        let probs: Vec<TokenProb> = sampled
            .candidates
            .into_iter()
            .filter(|c| c.token >= 0 && (c.token as usize) < vocab_size)
            .take(self.n_probs)
            .collect();

        trace!(token = sampled.token, candidates = probs.len(), "sampled");
        (sampled.token, probs)
    }

    pub fn accept(&mut self, token: Token, apply_grammar: bool) {
        self.inner.accept(token, apply_grammar);
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saguaro_runtime::SampledToken;

    struct FixedSampler {
        candidates: Vec<TokenProb>,
    }

    impl TokenSampler for FixedSampler {
        fn sample(&mut self) -> SampledToken {
            SampledToken {
                token: 42,
                candidates: self.candidates.clone(),
            }
        }

        fn accept(&mut self, _token: Token, _apply_grammar: bool) {}

        fn reset(&mut self) {}
    }

    #[test]
    fn test_clips_to_n_probs() {
        let candidates = (0..8).map(|t| TokenProb { token: t, prob: 0.1 }).collect();
        let mut adapter = SamplerAdapter::new(Box::new(FixedSampler { candidates }), 3);

        let (token, probs) = adapter.sample(100);
        assert_eq!(token, 42);
        assert_eq!(probs.len(), 3);
    }

    #[test]
    fn test_filters_out_of_vocab_candidates() {
        let candidates = vec![
            TokenProb { token: -1, prob: 0.4 },
            TokenProb { token: 5, prob: 0.3 },
            TokenProb {
                token: 999,
                prob: 0.2,
            },
        ];
        let mut adapter = SamplerAdapter::new(Box::new(FixedSampler { candidates }), 10);

        let (_, probs) = adapter.sample(100);
        assert_eq!(probs.len(), 1);
        assert_eq!(probs[0].token, 5);
    }
}
