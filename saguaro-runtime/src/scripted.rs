//! Scripted runtime for fixture playback
//!
//! Tests that exercise the session engine against a real inference backend
//! are slow and require large model files. [`ScriptedRuntime`] stands in for
//! a real backend: it has a byte-level vocabulary (token id == byte value),
//! replays a scripted token stream from sampling, and mirrors every cache
//! operation in an inspectable in-memory table, so engine behavior can be
//! asserted exactly.

use crate::error::RuntimeError;
use crate::sampling::SamplingParams;
use crate::types::{ModelConfig, PoolingMode, SampledToken, Token, TokenProb};
use crate::{ModelRuntime, RuntimeLoader, TokenSampler};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Beginning-of-sequence token in the byte-level vocabulary
pub const SCRIPTED_BOS: Token = 256;
/// End-of-sequence token in the byte-level vocabulary
pub const SCRIPTED_EOS: Token = 257;
/// Vocabulary size: 256 byte tokens plus BOS and EOS
pub const SCRIPTED_VOCAB: usize = 258;

/// A recorded script for [`ScriptedRuntime`], loadable from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedFixture {
    /// Context window size the runtime reports
    pub context_size: usize,
    /// Tokens the sampler emits, in order; EOS once exhausted
    pub script: Vec<Token>,
    /// Embedding vector the runtime reports, if any
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl ScriptedFixture {
    /// Load a fixture from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RuntimeError::LoadingFailed(format!(
                "Failed to read fixture at {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            RuntimeError::LoadingFailed(format!(
                "Failed to parse fixture JSON at {:?}: {}",
                path.as_ref(),
                e
            ))
        })
    }
}

/// Observable state shared between a [`ScriptedRuntime`], its samplers,
/// and the test that constructed it.
#[derive(Debug, Default)]
pub struct ScriptedState {
    /// (n_past, token count) per decode call, in order
    pub decode_log: Vec<(usize, usize)>,
    /// Cache contents as (position, token) pairs
    pub cache: Vec<(usize, Token)>,
    /// Tokens accepted into sampler history, with the grammar flag
    pub accepted: Vec<(Token, bool)>,
    /// Number of times timings were reset
    pub timing_resets: usize,
}

impl ScriptedState {
    /// Cache positions in ascending order
    pub fn cached_positions(&self) -> Vec<usize> {
        let mut positions: Vec<usize> = self.cache.iter().map(|(pos, _)| *pos).collect();
        positions.sort_unstable();
        positions
    }

    /// Cached tokens ordered by position
    pub fn cached_tokens(&self) -> Vec<Token> {
        let mut cells = self.cache.clone();
        cells.sort_unstable_by_key(|(pos, _)| *pos);
        cells.into_iter().map(|(_, token)| token).collect()
    }
}

/// Fixture-backed model runtime with a byte-level vocabulary.
///
/// Tokenization maps each input byte to the token of the same value, so
/// `token_to_bytes` round-trips any text by construction. Sampling pops
/// tokens from the script and falls back to EOS when it runs out.
pub struct ScriptedRuntime {
    context_size: usize,
    script: Arc<Mutex<VecDeque<Token>>>,
    state: Arc<Mutex<ScriptedState>>,
    embedding: Option<Vec<f32>>,
    embeddings_on: bool,
    pooling: PoolingMode,
    fail_decode_at: Option<usize>,
    fail_tokenize: bool,
}

impl ScriptedRuntime {
    pub fn new(context_size: usize, script: Vec<Token>) -> Self {
        Self {
            context_size,
            script: Arc::new(Mutex::new(script.into())),
            state: Arc::new(Mutex::new(ScriptedState::default())),
            embedding: None,
            embeddings_on: false,
            pooling: PoolingMode::None,
            fail_decode_at: None,
            fail_tokenize: false,
        }
    }

    pub fn from_fixture(fixture: ScriptedFixture) -> Self {
        let embeddings_on = fixture.embedding.is_some();
        let mut runtime = Self::new(fixture.context_size, fixture.script);
        runtime.embedding = fixture.embedding;
        runtime.embeddings_on = embeddings_on;
        runtime
    }

    /// Report the given embedding vector; enables embedding mode
    pub fn with_embeddings(mut self, embedding: Vec<f32>, pooling: PoolingMode) -> Self {
        self.embedding = Some(embedding);
        self.embeddings_on = true;
        self.pooling = pooling;
        self
    }

    /// Report an embedding width without enabling embedding mode
    pub fn with_embeddings_disabled(mut self, width: usize) -> Self {
        self.embedding = Some(vec![0.0; width]);
        self.embeddings_on = false;
        self
    }

    /// Fail the n-th decode call (zero-based)
    pub fn with_decode_failure_at(mut self, call: usize) -> Self {
        self.fail_decode_at = Some(call);
        self
    }

    /// Make all tokenize calls fail
    pub fn with_tokenize_failure(mut self) -> Self {
        self.fail_tokenize = true;
        self
    }

    /// Shared handle to the observable state, for assertions after the
    /// runtime has been handed to a session
    pub fn state(&self) -> Arc<Mutex<ScriptedState>> {
        Arc::clone(&self.state)
    }
}

impl ModelRuntime for ScriptedRuntime {
    fn context_size(&self) -> usize {
        self.context_size
    }

    fn vocab_size(&self) -> usize {
        SCRIPTED_VOCAB
    }

    fn bos_token(&self) -> Token {
        SCRIPTED_BOS
    }

    fn eos_token(&self) -> Token {
        SCRIPTED_EOS
    }

    fn is_eog_token(&self, token: Token) -> bool {
        token == SCRIPTED_EOS
    }

    fn embedding_width(&self) -> usize {
        self.embedding.as_ref().map(|e| e.len()).unwrap_or(0)
    }

    fn embeddings_enabled(&self) -> bool {
        self.embeddings_on
    }

    fn pooling(&self) -> PoolingMode {
        self.pooling
    }

    fn tokenize(
        &self,
        text: &str,
        add_bos: bool,
        _parse_special: bool,
    ) -> Result<Vec<Token>, RuntimeError> {
        if self.fail_tokenize {
            return Err(RuntimeError::Tokenization(
                "scripted tokenize failure".to_string(),
            ));
        }

        let mut tokens = Vec::with_capacity(text.len() + 1);
        if add_bos {
            tokens.push(SCRIPTED_BOS);
        }
        tokens.extend(text.bytes().map(Token::from));
        Ok(tokens)
    }

    fn token_to_bytes(&self, token: Token) -> Vec<u8> {
        if (0..256).contains(&token) {
            vec![token as u8]
        } else {
            Vec::new()
        }
    }

    fn decode(&mut self, tokens: &[Token], n_past: usize) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().expect("scripted state poisoned");
        let call = state.decode_log.len();
        state.decode_log.push((n_past, tokens.len()));

        if self.fail_decode_at == Some(call) {
            return Err(RuntimeError::DecodeFailed(format!(
                "scripted decode failure at call {}",
                call
            )));
        }

        for (offset, &token) in tokens.iter().enumerate() {
            let pos = n_past + offset;
            state.cache.retain(|(p, _)| *p != pos);
            state.cache.push((pos, token));
        }
        Ok(())
    }

    fn cache_remove(&mut self, start: usize, end: Option<usize>) {
        let end = end.unwrap_or(usize::MAX);
        let mut state = self.state.lock().expect("scripted state poisoned");
        state.cache.retain(|(pos, _)| *pos < start || *pos >= end);
    }

    fn cache_shift(&mut self, start: usize, end: usize, delta: isize) {
        let mut state = self.state.lock().expect("scripted state poisoned");
        for (pos, _) in state.cache.iter_mut() {
            if *pos >= start && *pos < end {
                *pos = (*pos as isize + delta) as usize;
            }
        }
    }

    fn embeddings(&self) -> Option<Vec<f32>> {
        self.embedding.clone()
    }

    fn embeddings_pooled(&self) -> Option<Vec<f32>> {
        self.embedding.clone()
    }

    fn new_sampler(&self, params: &SamplingParams) -> Result<Box<dyn TokenSampler>, RuntimeError> {
        params
            .validate()
            .map_err(RuntimeError::SamplerInit)?;

        Ok(Box::new(ScriptedSampler {
            script: Arc::clone(&self.script),
            state: Arc::clone(&self.state),
            n_probs: params.n_probs,
        }))
    }

    fn reset_timings(&mut self) {
        self.state
            .lock()
            .expect("scripted state poisoned")
            .timing_resets += 1;
    }
}

/// Sampler that replays the shared script
struct ScriptedSampler {
    script: Arc<Mutex<VecDeque<Token>>>,
    state: Arc<Mutex<ScriptedState>>,
    n_probs: usize,
}

impl TokenSampler for ScriptedSampler {
    fn sample(&mut self) -> SampledToken {
        let token = self
            .script
            .lock()
            .expect("scripted script poisoned")
            .pop_front()
            .unwrap_or(SCRIPTED_EOS);

        let candidates = if self.n_probs > 0 {
            vec![TokenProb { token, prob: 1.0 }]
        } else {
            Vec::new()
        };

        SampledToken { token, candidates }
    }

    fn accept(&mut self, token: Token, apply_grammar: bool) {
        self.state
            .lock()
            .expect("scripted state poisoned")
            .accepted
            .push((token, apply_grammar));
    }

    fn reset(&mut self) {
        self.state
            .lock()
            .expect("scripted state poisoned")
            .accepted
            .clear();
    }
}

/// Loader that validates configuration and produces a [`ScriptedRuntime`]
pub struct ScriptedLoader {
    fixture: ScriptedFixture,
}

impl ScriptedLoader {
    pub fn new(fixture: ScriptedFixture) -> Self {
        Self { fixture }
    }
}

impl RuntimeLoader for ScriptedLoader {
    fn load(
        &self,
        config: &ModelConfig,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn ModelRuntime>, RuntimeError> {
        if cancel.is_cancelled() {
            return Err(RuntimeError::LoadInterrupted);
        }

        config.validate()?;

        let mut runtime = ScriptedRuntime::from_fixture(self.fixture.clone());
        if let Some(n_ctx) = config.n_ctx {
            runtime.context_size = n_ctx as usize;
        }
        if config.embedding && runtime.embedding.is_none() {
            runtime.embedding = Some(vec![0.0; 4]);
            runtime.embeddings_on = true;
        }
        runtime.embeddings_on = config.embedding && runtime.embedding.is_some();
        Ok(Box::new(runtime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_round_trip() {
        let runtime = ScriptedRuntime::new(64, vec![]);
        let tokens = runtime.tokenize("héllo", true, true).unwrap();
        assert_eq!(tokens[0], SCRIPTED_BOS);

        let bytes: Vec<u8> = tokens
            .iter()
            .flat_map(|&t| runtime.token_to_bytes(t))
            .collect();
        assert_eq!(bytes, "héllo".as_bytes());
    }

    #[test]
    fn test_sampler_replays_script_then_eos() {
        let runtime = ScriptedRuntime::new(64, vec![104, 105]);
        let mut sampler = runtime
            .new_sampler(&SamplingParams::default())
            .unwrap();

        assert_eq!(sampler.sample().token, 104);
        assert_eq!(sampler.sample().token, 105);
        assert_eq!(sampler.sample().token, SCRIPTED_EOS);
        assert_eq!(sampler.sample().token, SCRIPTED_EOS);
    }

    #[test]
    fn test_sampler_rejects_invalid_params() {
        let runtime = ScriptedRuntime::new(64, vec![]);
        let params = SamplingParams {
            temperature: 5.0,
            ..Default::default()
        };
        assert!(matches!(
            runtime.new_sampler(&params),
            Err(RuntimeError::SamplerInit(_))
        ));
    }

    #[test]
    fn test_decode_populates_cache() {
        let mut runtime = ScriptedRuntime::new(64, vec![]);
        let state = runtime.state();

        runtime.decode(&[1, 2, 3], 0).unwrap();
        runtime.decode(&[4], 3).unwrap();

        let state = state.lock().unwrap();
        assert_eq!(state.cached_positions(), vec![0, 1, 2, 3]);
        assert_eq!(state.cached_tokens(), vec![1, 2, 3, 4]);
        assert_eq!(state.decode_log, vec![(0, 3), (3, 1)]);
    }

    #[test]
    fn test_cache_remove_and_shift() {
        let mut runtime = ScriptedRuntime::new(64, vec![]);
        let state = runtime.state();

        runtime.decode(&[10, 11, 12, 13, 14], 0).unwrap();
        runtime.cache_remove(1, Some(3));
        runtime.cache_shift(3, 5, -2);

        let state = state.lock().unwrap();
        assert_eq!(state.cached_positions(), vec![0, 1, 2]);
        assert_eq!(state.cached_tokens(), vec![10, 13, 14]);
    }

    #[test]
    fn test_decode_failure_injection() {
        let mut runtime = ScriptedRuntime::new(64, vec![]).with_decode_failure_at(1);

        assert!(runtime.decode(&[1], 0).is_ok());
        assert!(matches!(
            runtime.decode(&[2], 1),
            Err(RuntimeError::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_loader_observes_cancellation() {
        let loader = ScriptedLoader::new(ScriptedFixture {
            context_size: 64,
            script: vec![],
            embedding: None,
        });
        let config = ModelConfig {
            source: crate::types::ModelSource::Local {
                folder: std::env::temp_dir(),
                filename: None,
            },
            ..Default::default()
        };

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            loader.load(&config, &cancel),
            Err(RuntimeError::LoadInterrupted)
        ));

        assert!(loader.load(&config, &CancellationToken::new()).is_ok());
    }

    #[test]
    fn test_fixture_json_round_trip() {
        let fixture = ScriptedFixture {
            context_size: 128,
            script: vec![104, 105, SCRIPTED_EOS],
            embedding: Some(vec![0.5, 0.5]),
        };

        let json = serde_json::to_string(&fixture).unwrap();
        let parsed: ScriptedFixture = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.context_size, 128);
        assert_eq!(parsed.script, fixture.script);
        assert_eq!(parsed.embedding, fixture.embedding);
    }
}
