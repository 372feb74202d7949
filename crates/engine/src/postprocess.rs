//! Deterministic response post-processing.
//!
//! Applied in fixed order to every successful real-engine result:
//! 1. strip trailing end-of-turn/end-of-text markers at the very end
//! 2. strip a leading assistant-turn marker at the very start
//! 3. collapse runs of ≥4 newlines to 3 and runs of ≥3 horizontal
//!    whitespace characters to 2
//! 4. trim
//!
//! If steps 1-4 leave nothing but the raw result was non-empty, the raw,
//! merely-trimmed text is kept rather than discarding output.

use regex::Regex;
use std::sync::LazyLock;

use crate::template::{ASSISTANT_MARKER, END_OF_TEXT, END_OF_TURN};

static NEWLINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{4,}").expect("static regex"));
static HSPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{3,}").expect("static regex"));

/// Clean a raw native result.
pub fn clean_response(raw: &str) -> String {
    // (1) trailing markers, repeatedly, only at the very end
    let mut text: &str = raw.trim_end();
    loop {
        if let Some(rest) = text.strip_suffix(END_OF_TURN) {
            text = rest.trim_end();
        } else if let Some(rest) = text.strip_suffix(END_OF_TEXT) {
            text = rest.trim_end();
        } else {
            break;
        }
    }

    // (2) leading assistant marker, only at the very start
    let text = text.strip_prefix(ASSISTANT_MARKER).unwrap_or(text);

    // (3) whitespace run collapsing
    let text = NEWLINE_RUNS.replace_all(text, "\n\n\n");
    let text = HSPACE_RUNS.replace_all(&text, "  ");

    // (4) trim
    let cleaned = text.trim();

    if cleaned.is_empty() && !raw.trim().is_empty() {
        // Cleanup ate everything; keep the raw output rather than none.
        return raw.trim().to_string();
    }
    cleaned.to_string()
}

/// Truncate at a sentence boundary when the estimated token count
/// (chars/4) exceeds `max_tokens`.
///
/// Character budget is `max_tokens * 4`. The first applicable rule wins:
/// (a) latest sentence-ending punctuation followed by whitespace at or
/// before the budget; (b) latest word boundary past 70% of the budget;
/// (c) hard cut at the budget with the trailing partial word removed.
pub fn truncate_to_budget(text: &str, max_tokens: u32) -> String {
    let total_chars = text.chars().count();
    let estimated_tokens = total_chars.div_ceil(4);
    if estimated_tokens <= max_tokens as usize {
        return text.to_string();
    }

    let budget = max_tokens as usize * 4;

    let mut sentence_end: Option<usize> = None; // byte offset after punctuation
    let mut word_boundary: Option<(usize, usize)> = None; // (byte offset, char position)
    let mut budget_bytes = text.len();

    let mut chars = text.char_indices().enumerate().peekable();
    while let Some((char_pos, (byte_pos, c))) = chars.next() {
        if char_pos >= budget {
            budget_bytes = byte_pos;
            break;
        }
        match c {
            '.' | '!' | '?' => {
                let next_is_space = chars
                    .peek()
                    .is_some_and(|(_, (_, next))| next.is_whitespace());
                if next_is_space {
                    sentence_end = Some(byte_pos + c.len_utf8());
                }
            }
            c if c.is_whitespace() => {
                word_boundary = Some((byte_pos, char_pos));
            }
            _ => {}
        }
    }

    if let Some(end) = sentence_end {
        return text[..end].trim_end().to_string();
    }

    if let Some((byte_pos, char_pos)) = word_boundary {
        if char_pos * 10 > budget * 7 {
            return text[..byte_pos].trim_end().to_string();
        }
    }

    // Hard cut, dropping the trailing partial word if one exists.
    let cut = &text[..budget_bytes];
    match cut.rfind(char::is_whitespace) {
        Some(idx) => cut[..idx].trim_end().to_string(),
        None => cut.to_string(),
    }
}
