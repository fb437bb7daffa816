//! Single-shot streaming completion driver
//!
//! Drives a prepared [`Session`] end to end: sampler init, prompt load,
//! the step loop, and the streaming discipline around it. Bytes are only
//! flushed to the callback once they can no longer turn into a stop word
//! or sit inside an unfinished UTF-8 sequence; a matched stop word is
//! trimmed from the output entirely.

use tracing::debug;

use crate::error::SessionError;
use crate::output::CompletionOutcome;
use crate::session::Session;
use crate::stopper::StopScan;

/// Run one completion over `session`, streaming text to `on_token`.
///
/// The callback receives displayable text increments and returns whether
/// to continue; returning `false` interrupts the run. The session should
/// be rewound (or fresh) and have its parameters set before calling.
pub fn run_completion<F>(
    session: &mut Session,
    prompt: &str,
    mut on_token: F,
) -> Result<CompletionOutcome, SessionError>
where
    F: FnMut(&str) -> bool,
{
    session.init_sampling()?;
    session.begin_completion()?;
    if let Err(e) = session.load_prompt(prompt) {
        session.end_completion();
        return Err(e);
    }

    // Bytes of generated output already flushed to the callback
    let mut sent = 0usize;

    while session.has_next_token() && !session.is_interrupted() {
        let step = match session.do_completion() {
            Ok(step) => step,
            Err(e) => {
                session.end_completion();
                return Err(e);
            }
        };

        let Some(_) = step.token else {
            break;
        };
        let last_token_len = step.bytes.len();

        // Stop scans run over the whole output (the scan window is bounded
        // internally); positions are absolute byte offsets.
        let text = session.generated_bytes().to_vec();

        let stop_boundary = if let Some(pos) =
            session.find_stopping_strings(&text, last_token_len, StopScan::Full)
        {
            // Drop the stop word and everything after it
            session.truncate_generated(pos);
            pos
        } else if session.is_incomplete() {
            // Hold everything back until the trailing sequence finishes
            sent
        } else if let Some(pos) =
            session.find_stopping_strings(&text, last_token_len, StopScan::Partial)
        {
            // Hold back the bytes that may become a stop word
            pos
        } else {
            text.len()
        };

        let send_upto = stop_boundary.saturating_sub(sent);
        if send_upto > 0 {
            let text = String::from_utf8_lossy(&text[sent..sent + send_upto]).into_owned();
            sent += send_upto;
            if !on_token(&text) {
                debug!("completion interrupted by callback");
                session.interrupt();
                break;
            }
        }
    }

    // Flush anything still held back (e.g. a partial stop word that never
    // completed)
    if !session.is_interrupted() && session.generated_bytes().len() > sent {
        let text = String::from_utf8_lossy(&session.generated_bytes()[sent..]).into_owned();
        if !on_token(&text) {
            session.interrupt();
        }
    }

    session.end_completion();

    Ok(CompletionOutcome {
        text: session.generated_text(),
        tokens_predicted: session.num_tokens_predicted(),
        tokens_evaluated: session.num_prompt_tokens(),
        truncated: session.truncated(),
        stopped_eos: session.stopped_eos(),
        stopped_word: session.stopped_word(),
        stopped_limit: session.stopped_limit(),
        stopping_word: session.stopping_word().to_string(),
        interrupted: session.is_interrupted(),
    })
}
