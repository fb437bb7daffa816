//! Completion worker
//!
//! A [`CompletionWorker`] owns a [`Session`] on a dedicated OS thread and
//! serializes completion requests to it. Callers submit a request and
//! receive a channel of [`StreamChunk`]s plus a cancellation token for the
//! run. The worker is busy while a request is in flight; concurrent
//! submissions fail fast rather than queue silently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::completion::run_completion;
use crate::config::SessionParams;
use crate::error::SessionError;
use crate::output::{FinishReason, StreamChunk};
use crate::session::Session;
use saguaro_runtime::SamplingParams;

/// Worker channel sizing
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Capacity of the request queue
    pub queue_size: usize,
    /// Capacity of each per-request chunk channel
    pub chunk_buffer: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_size: 4,
            chunk_buffer: 32,
        }
    }
}

/// A completion request for the worker
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub params: SessionParams,
    pub sampling: SamplingParams,
}

struct WorkerJob {
    request: CompletionRequest,
    chunk_tx: mpsc::Sender<Result<StreamChunk, SessionError>>,
    cancel: CancellationToken,
}

/// Serialized completion execution over a session on its own thread
pub struct CompletionWorker {
    sender: Option<mpsc::Sender<WorkerJob>>,
    handle: Option<JoinHandle<()>>,
    busy: Arc<AtomicBool>,
    config: WorkerConfig,
}

impl CompletionWorker {
    /// Spawn a worker thread owning `session`
    pub fn new(session: Session, config: WorkerConfig) -> Self {
        let (sender, mut receiver) = mpsc::channel::<WorkerJob>(config.queue_size);
        let busy = Arc::new(AtomicBool::new(false));

        let worker_busy = Arc::clone(&busy);
        let handle = std::thread::spawn(move || {
            let mut session = session;
            while let Some(job) = receiver.blocking_recv() {
                Self::run_job(&mut session, job);
                worker_busy.store(false, Ordering::Release);
            }
            info!("completion worker shutting down");
        });

        Self {
            sender: Some(sender),
            handle: Some(handle),
            busy,
            config,
        }
    }

    fn run_job(session: &mut Session, job: WorkerJob) {
        session.rewind();
        session.adopt_interrupt(job.cancel.clone());

        if let Err(e) = session
            .set_params(job.request.params.clone())
            .and_then(|_| session.set_sampling(job.request.sampling.clone()))
        {
            let _ = job.chunk_tx.blocking_send(Err(e));
            return;
        }

        let chunk_tx = job.chunk_tx.clone();
        let mut chunks_sent = 0usize;
        let result = run_completion(session, &job.request.prompt, |text| {
            chunks_sent += 1;
            let chunk = StreamChunk {
                text: text.to_string(),
                is_complete: false,
                // The authoritative count arrives with the final chunk;
                // mid-stream chunks carry the delivery ordinal
                token_count: chunks_sent,
                finish_reason: None,
            };
            chunk_tx.blocking_send(Ok(chunk)).is_ok()
        });

        match result {
            Ok(outcome) => {
                debug!(
                    predicted = outcome.tokens_predicted,
                    interrupted = outcome.interrupted,
                    "completion finished"
                );
                let finish_reason = if outcome.interrupted {
                    Some(FinishReason::Interrupted)
                } else if outcome.stopped_word {
                    Some(FinishReason::StopWord(outcome.stopping_word.clone()))
                } else if outcome.stopped_eos {
                    Some(FinishReason::Eos)
                } else if outcome.stopped_limit {
                    Some(FinishReason::Limit)
                } else {
                    None
                };

                let _ = job.chunk_tx.blocking_send(Ok(StreamChunk {
                    text: String::new(),
                    is_complete: true,
                    token_count: outcome.tokens_predicted,
                    finish_reason,
                }));
            }
            Err(e) => {
                error!(error = %e, "completion failed");
                let _ = job.chunk_tx.blocking_send(Err(e));
            }
        }
    }

    /// Submit a completion, receiving the chunk stream and a token that
    /// cancels the run.
    ///
    /// Fails fast with [`SessionError::CompletionInProgress`] when a
    /// request is already in flight.
    pub fn submit_streaming(
        &self,
        request: CompletionRequest,
    ) -> Result<
        (
            mpsc::Receiver<Result<StreamChunk, SessionError>>,
            CancellationToken,
        ),
        SessionError,
    > {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("rejecting completion request: worker busy");
            return Err(SessionError::CompletionInProgress);
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(self.config.chunk_buffer);
        let cancel = CancellationToken::new();

        let job = WorkerJob {
            request,
            chunk_tx,
            cancel: cancel.clone(),
        };

        let sender = self.sender.as_ref().ok_or_else(|| {
            self.busy.store(false, Ordering::Release);
            SessionError::invalid_config("Worker is shut down")
        })?;

        sender.try_send(job).map_err(|_| {
            self.busy.store(false, Ordering::Release);
            SessionError::CompletionInProgress
        })?;

        Ok((chunk_rx, cancel))
    }

    /// Whether a request is currently in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Close the request queue and wait for the worker thread to exit
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CompletionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saguaro_runtime::scripted::ScriptedRuntime;
    use saguaro_runtime::Token;

    fn worker_with_script(script: Vec<Token>, config: WorkerConfig) -> CompletionWorker {
        let runtime = ScriptedRuntime::new(128, script);
        let session = Session::new(
            Box::new(runtime),
            SessionParams::default(),
            SamplingParams::default(),
        )
        .unwrap();
        CompletionWorker::new(session, config)
    }

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.to_string(),
            params: SessionParams::default(),
            sampling: SamplingParams::default(),
        }
    }

    #[tokio::test]
    async fn test_streams_text_and_final_chunk() {
        let script: Vec<Token> = "ok!".bytes().map(Token::from).collect();
        let worker = worker_with_script(script, WorkerConfig::default());

        let (mut rx, _cancel) = worker.submit_streaming(request("go")).unwrap();

        let mut text = String::new();
        let mut finish = None;
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk.unwrap();
            if chunk.is_complete {
                finish = chunk.finish_reason;
                assert_eq!(chunk.token_count, 3);
                break;
            }
            text.push_str(&chunk.text);
        }

        assert_eq!(text, "ok!");
        assert_eq!(finish, Some(FinishReason::Eos));
    }

    #[tokio::test]
    async fn test_busy_guard_rejects_second_request() {
        // Tiny chunk buffer: the worker blocks sending chunks until the
        // receiver drains, keeping it busy while we submit again.
        let script: Vec<Token> = std::iter::repeat(97).take(64).map(Token::from).collect();
        let worker = worker_with_script(
            script,
            WorkerConfig {
                queue_size: 1,
                chunk_buffer: 1,
            },
        );

        let (mut rx, _cancel) = worker.submit_streaming(request("go")).unwrap();

        // Give the worker time to pick the job up and fill the channel
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(worker.is_busy());

        let second = worker.submit_streaming(request("again"));
        assert!(matches!(second, Err(SessionError::CompletionInProgress)));

        // Drain to let the first request finish
        while let Some(chunk) = rx.recv().await {
            if chunk.unwrap().is_complete {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_cancel_interrupts_run() {
        let script: Vec<Token> = std::iter::repeat(97).take(500).map(Token::from).collect();
        let worker = worker_with_script(
            script,
            WorkerConfig {
                queue_size: 1,
                chunk_buffer: 1,
            },
        );

        let (mut rx, cancel) = worker.submit_streaming(request("go")).unwrap();

        // Read one chunk, then cancel
        let first = rx.recv().await.unwrap().unwrap();
        assert!(!first.is_complete);
        cancel.cancel();

        let mut finish = None;
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk.unwrap();
            if chunk.is_complete {
                finish = chunk.finish_reason;
                break;
            }
        }
        assert_eq!(finish, Some(FinishReason::Interrupted));
    }

    #[tokio::test]
    async fn test_invalid_request_params_surface_as_error() {
        let worker = worker_with_script(vec![], WorkerConfig::default());

        let bad = CompletionRequest {
            prompt: "go".to_string(),
            params: SessionParams {
                n_batch: 0,
                ..Default::default()
            },
            sampling: SamplingParams::default(),
        };

        let (mut rx, _cancel) = worker.submit_streaming(bad).unwrap();
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, Err(SessionError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_sequential_requests_after_completion() {
        let script: Vec<Token> = "abcdef".bytes().map(Token::from).collect();
        let worker = worker_with_script(script, WorkerConfig::default());

        for _ in 0..2 {
            let (mut rx, _cancel) = worker.submit_streaming(request("go")).unwrap();
            while let Some(chunk) = rx.recv().await {
                if chunk.unwrap().is_complete {
                    break;
                }
            }
            // The busy flag clears once the worker finishes the job
            while worker.is_busy() {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        }
    }
}
