//! Stop-word matching over generated bytes
//!
//! Generated output is a byte buffer (token pieces can split UTF-8
//! sequences), so matching is byte-oriented throughout.

/// How thoroughly to look for stop words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopScan {
    /// Find complete stop words. The search window is bounded: a complete
    /// match can only have appeared within the last
    /// `word.len() + last_token_len` bytes.
    Full,
    /// Find a trailing prefix of a stop word, to hold back bytes that may
    /// become a full match on the next token.
    Partial,
}

/// A stop-word match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopHit {
    /// Byte offset where the (possibly partial) stop word begins
    pub pos: usize,
    /// Index of the matching word in the word list
    pub word: usize,
}

/// Scan `text` for stop words. Returns the earliest hit across all words;
/// empty words never match.
pub fn find_stop(
    text: &[u8],
    last_token_len: usize,
    words: &[String],
    scan: StopScan,
) -> Option<StopHit> {
    let mut best: Option<StopHit> = None;

    for (index, word) in words.iter().enumerate() {
        if word.is_empty() {
            continue;
        }

        let pos = match scan {
            StopScan::Full => {
                let window = word.len() + last_token_len;
                let from_pos = if text.len() > window {
                    text.len() - window
                } else {
                    0
                };
                find_subsequence(&text[from_pos..], word.as_bytes()).map(|p| p + from_pos)
            }
            StopScan::Partial => find_partial_stop(word.as_bytes(), text),
        };

        if let Some(pos) = pos {
            if best.map_or(true, |hit| pos < hit.pos) {
                best = Some(StopHit { pos, word: index });
            }
        }
    }

    best
}

/// First occurrence of `needle` in `haystack`
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Longest prefix of `word` that is a suffix of `text`, reported as the
/// byte offset where that suffix starts.
fn find_partial_stop(word: &[u8], text: &[u8]) -> Option<usize> {
    if word.is_empty() || text.is_empty() {
        return None;
    }

    let max_len = word.len().min(text.len());
    for prefix_len in (1..=max_len).rev() {
        if text.ends_with(&word[..prefix_len]) {
            return Some(text.len() - prefix_len);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_full_match_at_end() {
        let hit = find_stop(b"hello STOP", 1, &words(&["STOP"]), StopScan::Full).unwrap();
        assert_eq!(hit.pos, 6);
        assert_eq!(hit.word, 0);
    }

    #[test]
    fn test_full_match_window_bound() {
        // The stop word appeared long before the search window; a full
        // scan is only responsible for text the last token could have
        // completed.
        let text = b"STOP and lots of text after it.....";
        assert_eq!(find_stop(text, 1, &words(&["STOP"]), StopScan::Full), None);
    }

    #[test]
    fn test_full_match_straddles_last_token() {
        // Last token contributed "OP"; the window must reach back far
        // enough to see the whole word.
        let hit = find_stop(b"abcSTOP", 2, &words(&["STOP"]), StopScan::Full).unwrap();
        assert_eq!(hit.pos, 3);
    }

    #[test]
    fn test_earliest_word_wins() {
        let hit = find_stop(
            b"a END STOP",
            8,
            &words(&["STOP", "END"]),
            StopScan::Full,
        )
        .unwrap();
        assert_eq!(hit.pos, 2);
        assert_eq!(hit.word, 1);
    }

    #[test]
    fn test_empty_words_never_match() {
        assert_eq!(find_stop(b"anything", 1, &words(&[""]), StopScan::Full), None);
        assert_eq!(
            find_stop(b"anything", 1, &words(&[""]), StopScan::Partial),
            None
        );
    }

    #[test]
    fn test_partial_prefix_as_suffix() {
        let hit = find_stop(b"hello ST", 1, &words(&["STOP"]), StopScan::Partial).unwrap();
        assert_eq!(hit.pos, 6);

        let hit = find_stop(b"hello S", 1, &words(&["STOP"]), StopScan::Partial).unwrap();
        assert_eq!(hit.pos, 6);
    }

    #[test]
    fn test_partial_prefers_longest_prefix() {
        // "aa" could match the prefix "a" at the last byte, but the longer
        // prefix "aa" starts one byte earlier.
        let hit = find_stop(b"xaa", 1, &words(&["aab"]), StopScan::Partial).unwrap();
        assert_eq!(hit.pos, 1);
    }

    #[test]
    fn test_partial_no_match() {
        assert_eq!(
            find_stop(b"hello", 1, &words(&["STOP"]), StopScan::Partial),
            None
        );
        assert_eq!(find_stop(b"", 1, &words(&["STOP"]), StopScan::Partial), None);
    }

    #[test]
    fn test_multibyte_stop_word() {
        let text = "done ✋".as_bytes();
        let hit = find_stop(text, 3, &words(&["✋"]), StopScan::Full).unwrap();
        assert_eq!(hit.pos, 5);

        // Only the first byte of the emoji has arrived
        let partial_text = &text[..6];
        let hit = find_stop(partial_text, 1, &words(&["✋"]), StopScan::Partial).unwrap();
        assert_eq!(hit.pos, 5);
    }
}
