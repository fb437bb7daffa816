//! The generation session state machine
//!
//! A [`Session`] binds a model runtime, a sampler, and the token buffer
//! into one autoregressive completion engine. The lifecycle is
//! `load_model` (or `rewind`) → `init_sampling` → `begin_completion` →
//! `load_prompt` → repeated `do_completion` until `has_next_token` goes
//! false. The higher-level [`run_completion`](crate::run_completion)
//! driver wraps that loop with streaming and stop-word trimming.

use saguaro_runtime::{
    ModelConfig, ModelRuntime, PoolingMode, RuntimeLoader, SamplingParams, Token,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::SessionParams;
use crate::error::SessionError;
use crate::output::CompletionStep;
use crate::sampler::SamplerAdapter;
use crate::stopper::{find_stop, StopScan};
use crate::utf8::trailing_incomplete;
use crate::window::{common_prefix_len, plan_shift, truncate_prompt};

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Model loaded, sampler not yet initialized
    Loaded,
    /// Sampler ready; a completion can begin
    SamplingReady,
    /// A completion is running
    Predicting,
}

/// The single cause that ended generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    /// End-of-generation token sampled
    Eos,
    /// A stop word appeared in the output
    Word,
    /// Token budget exhausted
    Limit,
}

/// A generation session over a model runtime.
pub struct Session {
    runtime: Box<dyn ModelRuntime>,
    sampler: Option<SamplerAdapter>,
    params: SessionParams,
    sampling: SamplingParams,

    /// Token buffer: prompt plus generated tokens, the session's view of
    /// what the runtime's cache holds
    embd: Vec<Token>,
    /// Number of leading buffer tokens already evaluated
    n_past: usize,
    /// Normalized keep count, set by `load_prompt`
    n_keep: usize,
    /// Remaining token budget; mirrors `n_predict` semantics
    n_remain: i64,

    num_prompt_tokens: usize,
    num_tokens_predicted: usize,

    /// Generated output as raw bytes; tokens can split UTF-8 sequences
    generated: Vec<u8>,
    generated_probs: Vec<CompletionStep>,

    phase: Phase,
    stop: Option<StopKind>,
    stopping_word: String,
    has_next_token: bool,
    truncated: bool,
    incomplete: bool,

    cancel: CancellationToken,
}

impl Session {
    /// Load a model through `loader` and construct a session over it.
    ///
    /// A load failure produces no session; callers start over with a fresh
    /// one. `cancel` lets a slow load be abandoned.
    pub fn load_model(
        loader: &dyn RuntimeLoader,
        config: &ModelConfig,
        params: SessionParams,
        sampling: SamplingParams,
        cancel: &CancellationToken,
    ) -> Result<Self, SessionError> {
        let runtime = loader.load(config, cancel)?;
        info!(
            n_ctx = runtime.context_size(),
            vocab = runtime.vocab_size(),
            embeddings = runtime.embeddings_enabled(),
            "model loaded"
        );
        Self::new(runtime, params, sampling)
    }

    /// Construct a session over an already-loaded runtime
    pub fn new(
        runtime: Box<dyn ModelRuntime>,
        params: SessionParams,
        sampling: SamplingParams,
    ) -> Result<Self, SessionError> {
        params.validate()?;
        sampling
            .validate()
            .map_err(SessionError::InvalidConfig)?;

        let n_ctx = runtime.context_size();
        Ok(Self {
            runtime,
            sampler: None,
            params,
            sampling,
            embd: Vec::new(),
            n_past: 0,
            n_keep: 0,
            n_remain: 0,
            num_prompt_tokens: 0,
            num_tokens_predicted: 0,
            generated: Vec::with_capacity(n_ctx),
            generated_probs: Vec::new(),
            phase: Phase::Loaded,
            stop: None,
            stopping_word: String::new(),
            has_next_token: false,
            truncated: false,
            incomplete: false,
            cancel: CancellationToken::new(),
        })
    }

    /// Reset all per-completion state.
    ///
    /// Idempotent. Clears the token buffer, output, counters, and stop
    /// flags, resets the sampler's history, and replaces the interruption
    /// token. Session parameters are caller-owned configuration and are
    /// left alone.
    pub fn rewind(&mut self) {
        self.cancel = CancellationToken::new();
        self.phase = if self.sampler.is_some() {
            Phase::SamplingReady
        } else {
            Phase::Loaded
        };
        self.num_prompt_tokens = 0;
        self.num_tokens_predicted = 0;
        self.generated.clear();
        self.generated.reserve(self.runtime.context_size());
        self.generated_probs.clear();
        self.truncated = false;
        self.stop = None;
        self.stopping_word.clear();
        self.incomplete = false;
        self.has_next_token = false;
        self.n_remain = 0;
        self.n_past = 0;
        self.embd.clear();
        if let Some(sampler) = &mut self.sampler {
            sampler.reset();
        }
        debug!("session rewound");
    }

    /// Build (or rebuild) the sampler from the current sampling parameters
    pub fn init_sampling(&mut self) -> Result<(), SessionError> {
        self.sampling
            .validate()
            .map_err(SessionError::InvalidConfig)?;

        let sampler = self.runtime.new_sampler(&self.sampling)?;
        self.sampler = Some(SamplerAdapter::new(sampler, self.sampling.n_probs));
        if self.phase == Phase::Loaded {
            self.phase = Phase::SamplingReady;
        }
        debug!(seed = self.sampling.seed, "sampler initialized");
        Ok(())
    }

    /// Start a completion: arm the token budget and reset runtime timings.
    ///
    /// Fails fast with [`SessionError::CompletionInProgress`] when a
    /// completion is already running.
    pub fn begin_completion(&mut self) -> Result<(), SessionError> {
        if self.phase == Phase::Predicting {
            return Err(SessionError::CompletionInProgress);
        }
        if self.sampler.is_none() {
            return Err(SessionError::SamplerNotInitialized);
        }

        self.n_remain = self.params.n_predict;
        self.runtime.reset_timings();
        self.phase = Phase::Predicting;
        Ok(())
    }

    /// Mark the running completion as finished
    pub fn end_completion(&mut self) {
        if self.phase == Phase::Predicting {
            self.phase = Phase::SamplingReady;
        }
    }

    /// Tokenize the prompt and prepare the buffer for generation.
    ///
    /// Oversized prompts are truncated once to fit the window. The longest
    /// common prefix with the previous buffer is reused: already-evaluated
    /// positions are kept and the runtime cache is rolled back past them.
    pub fn load_prompt(&mut self, prompt: &str) -> Result<(), SessionError> {
        let sampler = self
            .sampler
            .as_mut()
            .ok_or(SessionError::SamplerNotInitialized)?;

        let mut prompt_tokens = self.runtime.tokenize(prompt, true, true)?;
        self.num_prompt_tokens = prompt_tokens.len();

        let n_ctx = self.runtime.context_size();

        // Normalize n_keep: -1 keeps the whole prompt, and the keep region
        // must leave at least 4 positions for generation.
        let mut n_keep = if self.params.n_keep < 0 {
            self.num_prompt_tokens as i64
        } else {
            self.params.n_keep as i64
        };
        n_keep = n_keep.min(if n_ctx > 4 { (n_ctx - 4) as i64 } else { 0 });
        self.n_keep = n_keep.max(0) as usize;

        if self.num_prompt_tokens >= n_ctx {
            if let Some(new_tokens) = truncate_prompt(&prompt_tokens, self.n_keep, n_ctx) {
                debug!(
                    n_ctx,
                    n_keep = self.n_keep,
                    old_len = self.num_prompt_tokens,
                    new_len = new_tokens.len(),
                    "prompt truncated"
                );
                prompt_tokens = new_tokens;
                self.num_prompt_tokens = prompt_tokens.len();
                self.truncated = true;
            }
        }

        // Feed the prompt into the sampler's history without grammar
        for &token in &prompt_tokens {
            sampler.accept(token, false);
        }

        // Reuse whatever prefix of the previous buffer still matches
        self.n_past = common_prefix_len(&self.embd, &prompt_tokens);
        self.embd = prompt_tokens;
        self.n_past = self.n_past.min(self.embd.len());

        if self.n_past == self.num_prompt_tokens && self.n_past > 0 {
            // At least one token must be evaluated to produce logits
            self.n_past -= 1;
        }

        if self.n_past > 0 {
            self.runtime.cache_remove(self.n_past, None);
        }

        debug!(
            n_past = self.n_past,
            to_eval = self.embd.len() - self.n_past,
            "prompt ingested"
        );

        self.has_next_token = true;
        Ok(())
    }

    /// Evaluate pending buffer tokens and sample the next one.
    ///
    /// Shifts the context window first when the buffer has filled it.
    /// Interruption is observed between decode batches; an interrupted
    /// step returns an empty [`CompletionStep`] with `has_next_token`
    /// cleared.
    pub fn next_token(&mut self) -> Result<CompletionStep, SessionError> {
        let n_ctx = self.runtime.context_size();

        if self.embd.len() >= n_ctx {
            let plan = plan_shift(self.n_past, self.n_keep, n_ctx).map_err(|e| {
                self.has_next_token = false;
                SessionError::ContextTooSmall {
                    n_ctx: e.n_ctx,
                    n_keep: e.n_keep,
                }
            })?;

            // No plan means nothing past the keep prefix is discardable
            // yet; evaluation proceeds and a later step shifts once the
            // span grows. The n_keep clamp at prompt load (n_ctx - 4)
            // guarantees a full window always has something to discard.
            if let Some(plan) = plan {
                let gap_end = plan.start + plan.n_discard;
                self.runtime.cache_remove(plan.start, Some(gap_end));
                self.runtime
                    .cache_shift(gap_end, self.n_past, -(plan.n_discard as isize));

                self.embd.drain(plan.start..gap_end);
                self.n_past -= plan.n_discard;

                debug!(
                    n_ctx,
                    n_keep = self.n_keep,
                    n_discard = plan.n_discard,
                    n_past = self.n_past,
                    "context shifted"
                );
            }
        }

        // Catch up on unevaluated buffer tokens in n_batch chunks
        while self.n_past < self.embd.len() {
            let n_eval = (self.embd.len() - self.n_past).min(self.params.n_batch);
            let chunk = self.embd[self.n_past..self.n_past + n_eval].to_vec();

            if let Err(e) = self.runtime.decode(&chunk, self.n_past) {
                warn!(n_eval, n_past = self.n_past, "decode failed");
                self.has_next_token = false;
                return Err(e.into());
            }
            self.n_past += n_eval;

            if self.cancel.is_cancelled() {
                info!("decoding interrupted");
                self.embd.truncate(self.n_past);
                self.has_next_token = false;
                return Ok(CompletionStep::empty());
            }
        }

        if self.params.n_predict == 0 {
            self.has_next_token = false;
            let eos = self.runtime.eos_token();
            return Ok(CompletionStep {
                token: Some(eos),
                bytes: self.runtime.token_to_bytes(eos),
                probs: Vec::new(),
            });
        }

        let vocab_size = self.runtime.vocab_size();
        let sampler = self
            .sampler
            .as_mut()
            .ok_or(SessionError::SamplerNotInitialized)?;

        let (token, probs) = sampler.sample(vocab_size);
        sampler.accept(token, true);

        self.embd.push(token);
        if self.n_remain > 0 {
            self.n_remain -= 1;
        }

        if self.runtime.is_eog_token(token) {
            self.has_next_token = false;
            self.stop = Some(StopKind::Eos);
            trace!("eos token sampled");
            return Ok(CompletionStep {
                token: Some(token),
                bytes: self.runtime.token_to_bytes(token),
                probs,
            });
        }

        self.num_tokens_predicted += 1;
        self.has_next_token = self.params.n_predict == -1 || self.n_remain > 0;

        Ok(CompletionStep {
            token: Some(token),
            bytes: self.runtime.token_to_bytes(token),
            probs,
        })
    }

    /// One full completion step: sample, append output bytes, update the
    /// UTF-8 completeness flag, and settle the budget stop.
    pub fn do_completion(&mut self) -> Result<CompletionStep, SessionError> {
        let step = self.next_token()?;

        if step.token.is_none() && !self.has_next_token {
            return Ok(step);
        }

        self.generated.extend_from_slice(&step.bytes);

        if self.sampling.n_probs > 0 {
            self.generated_probs.push(step.clone());
        }

        self.incomplete = trailing_incomplete(&self.generated);

        if self.incomplete && !self.has_next_token && self.stop != Some(StopKind::Eos) {
            // Never end output on a dangling partial sequence; buy one
            // more step to finish it. After EOS no further bytes can
            // arrive, so the tail stays incomplete and generation ends.
            self.has_next_token = true;
            if self.params.n_predict != -1 {
                self.n_remain += 1;
            }
        }

        if !self.has_next_token
            && self.n_remain == 0
            && self.params.n_predict != -1
            && self.stop.is_none()
        {
            self.stop = Some(StopKind::Limit);
        }

        trace!(
            token = ?step.token,
            has_next = self.has_next_token,
            n_remain = self.n_remain,
            incomplete = self.incomplete,
            predicted = self.num_tokens_predicted,
            "completion step"
        );

        Ok(step)
    }

    /// Scan `text` for stop words. A full match records the stop word and
    /// ends generation; the returned offset lets the caller trim output.
    pub fn find_stopping_strings(
        &mut self,
        text: &[u8],
        last_token_len: usize,
        scan: StopScan,
    ) -> Option<usize> {
        let hit = find_stop(text, last_token_len, &self.params.antiprompts, scan)?;

        if scan == StopScan::Full {
            self.stopping_word = self.params.antiprompts[hit.word].clone();
            self.stop = Some(StopKind::Word);
            self.has_next_token = false;
            debug!(word = %self.stopping_word, pos = hit.pos, "stop word matched");
        }

        Some(hit.pos)
    }

    /// Trim generated output to `len` bytes (used to drop a matched stop word)
    pub fn truncate_generated(&mut self, len: usize) {
        self.generated.truncate(len);
    }

    /// Embedding vector for the evaluated sequence.
    ///
    /// When the model was not loaded in embedding mode this returns a zero
    /// vector of the embedding width rather than failing; check
    /// [`embeddings_enabled`](Self::embeddings_enabled) to distinguish.
    pub fn embedding(&self) -> Vec<f32> {
        let width = self.runtime.embedding_width();

        if !self.runtime.embeddings_enabled() {
            warn!("embedding requested but embedding mode is disabled");
            return vec![0.0; width];
        }

        let raw = match self.runtime.pooling() {
            PoolingMode::None => self.runtime.embeddings(),
            _ => self.runtime.embeddings_pooled(),
        };

        raw.unwrap_or_else(|| vec![0.0; width])
    }

    /// Whether the runtime can produce real embeddings
    pub fn embeddings_enabled(&self) -> bool {
        self.runtime.embeddings_enabled()
    }

    /// Tokenize text without an implicit BOS token
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, SessionError> {
        Ok(self.runtime.tokenize(text, false, true)?)
    }

    /// Concatenated byte pieces for a token sequence
    pub fn detokenize(&self, tokens: &[Token]) -> Vec<u8> {
        tokens
            .iter()
            .flat_map(|&t| self.runtime.token_to_bytes(t))
            .collect()
    }

    /// Replace the session parameters. Rejected while a completion runs.
    pub fn set_params(&mut self, params: SessionParams) -> Result<(), SessionError> {
        if self.phase == Phase::Predicting {
            return Err(SessionError::CompletionInProgress);
        }
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Replace the sampling parameters; takes effect at the next
    /// `init_sampling`. Rejected while a completion runs.
    pub fn set_sampling(&mut self, sampling: SamplingParams) -> Result<(), SessionError> {
        if self.phase == Phase::Predicting {
            return Err(SessionError::CompletionInProgress);
        }
        sampling
            .validate()
            .map_err(SessionError::InvalidConfig)?;
        self.sampling = sampling;
        Ok(())
    }

    /// Handle for interrupting this session from another thread.
    ///
    /// Replaced on every `rewind`, so take it after rewinding.
    pub fn interrupt_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Adopt an external interruption token (replacing the session's own)
    pub fn adopt_interrupt(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    /// Request cooperative interruption of the running completion
    pub fn interrupt(&self) {
        self.cancel.cancel();
    }

    pub fn is_interrupted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // Status accessors

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_predicting(&self) -> bool {
        self.phase == Phase::Predicting
    }

    pub fn has_next_token(&self) -> bool {
        self.has_next_token
    }

    pub fn stopped_eos(&self) -> bool {
        self.stop == Some(StopKind::Eos)
    }

    pub fn stopped_word(&self) -> bool {
        self.stop == Some(StopKind::Word)
    }

    pub fn stopped_limit(&self) -> bool {
        self.stop == Some(StopKind::Limit)
    }

    pub fn stop_kind(&self) -> Option<StopKind> {
        self.stop
    }

    pub fn stopping_word(&self) -> &str {
        &self.stopping_word
    }

    /// Generated output decoded as text; lossy only while the tail is an
    /// incomplete UTF-8 sequence
    pub fn generated_text(&self) -> String {
        String::from_utf8_lossy(&self.generated).into_owned()
    }

    /// Generated output as raw bytes
    pub fn generated_bytes(&self) -> &[u8] {
        &self.generated
    }

    /// Per-step candidate probabilities, recorded when `n_probs > 0`
    pub fn generated_token_probs(&self) -> &[CompletionStep] {
        &self.generated_probs
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn num_tokens_predicted(&self) -> usize {
        self.num_tokens_predicted
    }

    pub fn num_prompt_tokens(&self) -> usize {
        self.num_prompt_tokens
    }

    pub fn n_past(&self) -> usize {
        self.n_past
    }

    /// Current token buffer length (prompt plus generated)
    pub fn token_buffer_len(&self) -> usize {
        self.embd.len()
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn sampling(&self) -> &SamplingParams {
        &self.sampling
    }

    pub fn context_size(&self) -> usize {
        self.runtime.context_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saguaro_runtime::scripted::{ScriptedRuntime, SCRIPTED_EOS};

    fn session_with(script: Vec<Token>, n_ctx: usize, params: SessionParams) -> Session {
        let runtime = ScriptedRuntime::new(n_ctx, script);
        Session::new(Box::new(runtime), params, SamplingParams::default()).unwrap()
    }

    #[test]
    fn test_lifecycle_order_enforced() {
        let mut session = session_with(vec![], 64, SessionParams::default());

        assert!(matches!(
            session.begin_completion(),
            Err(SessionError::SamplerNotInitialized)
        ));
        assert!(matches!(
            session.load_prompt("hi"),
            Err(SessionError::SamplerNotInitialized)
        ));

        session.init_sampling().unwrap();
        assert_eq!(session.phase(), Phase::SamplingReady);
        session.begin_completion().unwrap();
        assert_eq!(session.phase(), Phase::Predicting);
    }

    #[test]
    fn test_begin_completion_guard() {
        let mut session = session_with(vec![], 64, SessionParams::default());
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();

        assert!(matches!(
            session.begin_completion(),
            Err(SessionError::CompletionInProgress)
        ));
        assert!(matches!(
            session.set_params(SessionParams::default()),
            Err(SessionError::CompletionInProgress)
        ));

        session.end_completion();
        assert!(session.begin_completion().is_ok());
    }

    #[test]
    fn test_rewind_is_idempotent() {
        let mut session = session_with(vec![104, 105], 64, SessionParams::default());
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();
        session.load_prompt("hi").unwrap();
        session.do_completion().unwrap();
        assert!(session.num_tokens_predicted() > 0 || session.has_next_token());

        session.rewind();
        assert_eq!(session.num_tokens_predicted(), 0);
        assert_eq!(session.n_past(), 0);
        assert_eq!(session.token_buffer_len(), 0);
        assert_eq!(session.generated_bytes(), b"");
        assert!(!session.has_next_token());
        assert_eq!(session.stop_kind(), None);

        session.rewind();
        assert_eq!(session.token_buffer_len(), 0);
        assert_eq!(session.phase(), Phase::SamplingReady);
    }

    #[test]
    fn test_load_prompt_evaluates_and_caches() {
        let mut session = session_with(vec![SCRIPTED_EOS], 64, SessionParams::default());
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();
        session.load_prompt("hello").unwrap();

        // BOS + 5 bytes
        assert_eq!(session.num_prompt_tokens(), 6);
        assert_eq!(session.n_past(), 0);
        assert!(session.has_next_token());
    }

    #[test]
    fn test_prompt_cache_common_prefix_reuse() {
        let mut session = session_with(
            vec![SCRIPTED_EOS, SCRIPTED_EOS],
            64,
            SessionParams::default(),
        );
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();
        session.load_prompt("hello").unwrap();
        // Evaluate the prompt and sample (EOS)
        session.do_completion().unwrap();
        assert!(session.stopped_eos());

        // Extended prompt: the evaluated "hello" prefix is reused
        session.load_prompt("hello!").unwrap();
        assert_eq!(session.n_past(), 6);
        assert_eq!(session.token_buffer_len(), 7);
    }

    #[test]
    fn test_prompt_cache_identical_prompt_re_evaluates_one() {
        let mut session = session_with(
            vec![SCRIPTED_EOS, SCRIPTED_EOS],
            64,
            SessionParams::default(),
        );
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();
        session.load_prompt("hello").unwrap();
        session.do_completion().unwrap();

        session.load_prompt("hello").unwrap();
        // Whole prompt matched; one token is re-evaluated for logits
        assert_eq!(session.n_past(), session.num_prompt_tokens() - 1);
    }

    #[test]
    fn test_prompt_truncation_sets_flag_and_fits() {
        let params = SessionParams {
            n_keep: -1,
            ..Default::default()
        };
        let mut session = session_with(vec![SCRIPTED_EOS], 32, params);
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();

        let long_prompt: String = std::iter::repeat('x').take(40).collect();
        session.load_prompt(&long_prompt).unwrap();

        assert!(session.truncated());
        assert!(session.num_prompt_tokens() < 32);
    }

    #[test]
    fn test_n_predict_zero_returns_eos_immediately() {
        let params = SessionParams {
            n_predict: 0,
            ..Default::default()
        };
        let mut session = session_with(vec![104, 105], 64, params);
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();
        session.load_prompt("hi").unwrap();

        let step = session.do_completion().unwrap();
        assert_eq!(step.token, Some(SCRIPTED_EOS));
        assert!(!session.has_next_token());
        assert!(session.stopped_limit());
        assert_eq!(session.num_tokens_predicted(), 0);
    }

    #[test]
    fn test_interrupt_truncates_buffer_at_batch_boundary() {
        let params = SessionParams {
            n_batch: 2,
            ..Default::default()
        };
        let mut session = session_with(vec![104], 64, params);
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();
        session.load_prompt("hello").unwrap();

        session.interrupt();
        let step = session.do_completion().unwrap();
        assert_eq!(step.token, None);
        assert!(!session.has_next_token());
        // One batch of two tokens was decoded before the check
        assert_eq!(session.n_past(), 2);
        assert_eq!(session.token_buffer_len(), 2);
    }

    #[test]
    fn test_decode_failure_surfaces_error() {
        let runtime = ScriptedRuntime::new(64, vec![104]).with_decode_failure_at(0);
        let mut session = Session::new(
            Box::new(runtime),
            SessionParams::default(),
            SamplingParams::default(),
        )
        .unwrap();
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();
        session.load_prompt("hi").unwrap();

        let result = session.do_completion();
        assert!(matches!(result, Err(SessionError::Runtime(_))));
        assert!(!session.has_next_token());
    }

    #[test]
    fn test_invariant_buffer_bounds() {
        let mut session = session_with((0..200).map(|_| 97).collect(), 64, SessionParams::default());
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();
        session.load_prompt("start").unwrap();

        for _ in 0..120 {
            if !session.has_next_token() {
                break;
            }
            session.do_completion().unwrap();
            assert!(session.n_past() <= session.token_buffer_len());
            assert!(session.token_buffer_len() <= session.context_size());
        }
    }

    #[test]
    fn test_eos_with_incomplete_tail_terminates() {
        // A dangling lead byte followed by EOS: the tail can never
        // complete, so generation must end rather than demand more tokens.
        let mut session = session_with(vec![0xC3], 64, SessionParams::default());
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();
        session.load_prompt("p").unwrap();

        let mut steps = 0;
        while session.has_next_token() && steps < 10 {
            session.do_completion().unwrap();
            steps += 1;
        }

        assert!(!session.has_next_token());
        assert!(session.stopped_eos());
        assert!(session.is_incomplete());
        assert_eq!(session.num_tokens_predicted(), 1);
        assert_eq!(steps, 2);
    }

    #[test]
    fn test_incomplete_tail_at_budget_buys_one_step() {
        // "é" split across two tokens with n_predict = 1: the budget stop
        // is deferred until the sequence finishes.
        let params = SessionParams {
            n_predict: 1,
            ..Default::default()
        };
        let mut session = session_with(vec![0xC3, 0xA9], 64, params);
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();
        session.load_prompt("p").unwrap();

        session.do_completion().unwrap();
        assert!(session.is_incomplete());
        assert!(session.has_next_token());

        session.do_completion().unwrap();
        assert!(!session.is_incomplete());
        assert!(!session.has_next_token());
        assert!(session.stopped_limit());
        assert_eq!(session.generated_text(), "é");
    }

    #[test]
    fn test_tiny_context_with_clamped_keep_makes_progress() {
        // n_keep = -1 is clamped to n_ctx - 4 at prompt load, which keeps
        // every shift able to discard at least one position.
        let params = SessionParams {
            n_keep: -1,
            n_predict: 8,
            ..Default::default()
        };
        let mut session = session_with((0..20).map(|_| 97).collect(), 6, params);
        session.init_sampling().unwrap();
        session.begin_completion().unwrap();
        session.load_prompt("abcdefgh").unwrap();

        while session.has_next_token() {
            session.do_completion().unwrap();
            assert!(session.n_past() <= session.token_buffer_len());
            assert!(session.token_buffer_len() <= session.context_size());
        }

        assert_eq!(session.num_tokens_predicted(), 8);
        assert!(session.stopped_limit());
    }

    #[test]
    fn test_embedding_disabled_returns_zero_vector() {
        let runtime = ScriptedRuntime::new(64, vec![]).with_embeddings_disabled(4);
        let session = Session::new(
            Box::new(runtime),
            SessionParams::default(),
            SamplingParams::default(),
        )
        .unwrap();

        assert!(!session.embeddings_enabled());
        assert_eq!(session.embedding(), vec![0.0; 4]);
    }

    #[test]
    fn test_tokenize_detokenize_round_trip() {
        let session = session_with(vec![], 64, SessionParams::default());
        let tokens = session.tokenize("round trip ✓").unwrap();
        assert_eq!(session.detokenize(&tokens), "round trip ✓".as_bytes());
    }
}
