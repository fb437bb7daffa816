//! Context window arithmetic
//!
//! Pure helpers for the two ways a session keeps a long conversation inside
//! a fixed context window: shifting (discard a block from the middle of the
//! evaluated sequence once the window is full) and one-time prompt
//! truncation (drop whole blocks from the middle of an oversized prompt
//! before it is ever evaluated). Both always preserve the window prefix.

use saguaro_runtime::Token;
use thiserror::Error;

/// The window cannot shift because everything is protected by `n_keep`
#[derive(Error, Debug, PartialEq, Eq)]
#[error("context size {n_ctx} too small for keep {n_keep}")]
pub struct ShiftError {
    pub n_ctx: usize,
    pub n_keep: usize,
}

/// A planned context shift: discard `n_discard` tokens starting at `start`,
/// then slide everything after the gap back by `n_discard` positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftPlan {
    /// First discarded position; always `n_keep + 1`
    pub start: usize,
    /// Number of positions discarded
    pub n_discard: usize,
}

/// Plan a context shift for a full window.
///
/// Discards half of the evaluated span past the protected prefix. The
/// prefix `[0, n_keep]` (inclusive of position `n_keep`) always survives.
/// Returns `Ok(None)` when there is nothing to discard.
pub fn plan_shift(
    n_past: usize,
    n_keep: usize,
    n_ctx: usize,
) -> Result<Option<ShiftPlan>, ShiftError> {
    if n_ctx <= n_keep + 1 {
        return Err(ShiftError { n_ctx, n_keep });
    }

    let n_left = n_past as isize - n_keep as isize - 1;
    let n_discard = if n_left > 0 { (n_left / 2) as usize } else { 0 };

    if n_discard == 0 {
        return Ok(None);
    }

    Ok(Some(ShiftPlan {
        start: n_keep + 1,
        n_discard,
    }))
}

/// Truncate an oversized prompt to fit the context window.
///
/// Keeps the first `n_keep` tokens, erases whole blocks of size
/// `(n_ctx - n_keep) / 2` from the middle, and keeps the remaining suffix.
/// Returns `None` when the prompt already fits.
pub fn truncate_prompt(tokens: &[Token], n_keep: usize, n_ctx: usize) -> Option<Vec<Token>> {
    if tokens.len() < n_ctx {
        return None;
    }

    let n_left = n_ctx.saturating_sub(n_keep);
    let block_size = n_left / 2;
    let erased_blocks = if block_size > 0 {
        ((tokens.len() as isize - n_keep as isize - block_size as isize)
            / block_size as isize)
            .max(0) as usize
    } else {
        0
    };

    let keep_count = n_keep.min(tokens.len());
    let mut new_tokens = tokens[..keep_count].to_vec();

    let suffix_start = keep_count + erased_blocks * block_size;
    if suffix_start < tokens.len() {
        new_tokens.extend_from_slice(&tokens[suffix_start..]);
    }

    Some(new_tokens)
}

/// Length of the longest common prefix of two token sequences
pub fn common_prefix_len(a: &[Token], b: &[Token]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
