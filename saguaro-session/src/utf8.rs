//! Trailing UTF-8 completeness detection
//!
//! Token pieces are byte sequences that can end mid-codepoint. The session
//! uses this check to withhold a dangling partial sequence from callers and
//! to force one more generation step when output would otherwise end on one.

/// Whether `bytes` ends with an incomplete UTF-8 sequence.
///
/// Empty input, ASCII tails, and malformed tails (e.g. a stray continuation
/// byte with no lead byte in reach) all count as complete; only a genuinely
/// unfinished multi-byte sequence returns true.
pub fn trailing_incomplete(bytes: &[u8]) -> bool {
    let Some(&last) = bytes.last() else {
        return false;
    };

    if last & 0xC0 == 0x80 {
        // Ends with a continuation byte; walk back to the lead byte to see
        // whether the sequence is finished.
        let mut lookback = 1;
        while lookback < 4 && lookback < bytes.len() {
            let prev = bytes[bytes.len() - 1 - lookback];
            if prev & 0xC0 == 0xC0 {
                let expected = if prev & 0xE0 == 0xC0 {
                    1
                } else if prev & 0xF0 == 0xE0 {
                    2
                } else if prev & 0xF8 == 0xF0 {
                    3
                } else {
                    0
                };
                return lookback < expected;
            } else if prev & 0x80 == 0x00 {
                // ASCII byte breaks the sequence; the tail is malformed,
                // not incomplete
                return false;
            }
            lookback += 1;
        }
        false
    } else if last & 0xE0 == 0xC0 {
        true // lead byte expecting 1 continuation
    } else if last & 0xF0 == 0xE0 {
        true // lead byte expecting 2 continuations
    } else if last & 0xF8 == 0xF0 {
        true // lead byte expecting 3 continuations
    } else {
        false
    }
}
