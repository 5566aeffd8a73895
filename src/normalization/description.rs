//! Description cleaning
//!
//! Scraped descriptions carry exotic whitespace, a trailing "...more" link
//! label, and sometimes the same paragraph twice in a row. The cleaner removes
//! all three, then bounds the length. Cleaning its own output changes nothing.

use once_cell::sync::Lazy;
use regex::Regex;

static MORE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:\.\.\.|…)\s*more\s*$").expect("valid more-marker pattern"));

static HORIZONTAL_WS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\S\n]+").expect("valid whitespace pattern"));

static SPACED_NEWLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" ?\n ?").expect("valid newline pattern"));

static BLANK_LINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{2,}").expect("valid blank-line pattern"));

const ELLIPSIS: char = '…';

/// Upper bound on cleaning rounds; in practice the text is stable after two.
const MAX_ROUNDS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptionCleaner {
    /// Maximum length in characters; 0 disables truncation.
    max_len: usize,
    min_repeat: usize,
    max_repeat: usize,
}

impl DescriptionCleaner {
    pub const DEFAULT_MIN_REPEAT: usize = 80;
    pub const DEFAULT_MAX_REPEAT: usize = 400;

    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            min_repeat: Self::DEFAULT_MIN_REPEAT,
            max_repeat: Self::DEFAULT_MAX_REPEAT,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn clean(&self, raw: &str) -> Option<String> {
        let mut text = normalize_exotic_whitespace(raw);

        for _ in 0..MAX_ROUNDS {
            let next = self.clean_round(&text);
            if next == text {
                break;
            }
            text = next;
        }

        let text = self.truncate(&text);
        (!text.is_empty()).then_some(text)
    }

    fn clean_round(&self, text: &str) -> String {
        let mut s = text.to_string();
        while MORE_MARKER_RE.is_match(&s) {
            s = MORE_MARKER_RE.replace(&s, "").into_owned();
        }
        let s = collapse_layout(&s);
        let s = collapse_immediate_repeats(&s, self.min_repeat, self.max_repeat);
        s.trim().to_string()
    }

    fn truncate(&self, text: &str) -> String {
        if self.max_len == 0 || text.chars().count() <= self.max_len {
            return text.to_string();
        }

        // Leave room for the ellipsis so the result never exceeds max_len.
        let prefix: String = text.chars().take(self.max_len.saturating_sub(1)).collect();
        let cut = match prefix.rfind(char::is_whitespace) {
            Some(idx) if idx > 0 => &prefix[..idx],
            _ => prefix.as_str(),
        };

        let mut truncated = cut.trim_end().to_string();
        truncated.push(ELLIPSIS);
        truncated
    }
}

fn normalize_exotic_whitespace(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .chars()
        .filter_map(|c| match c {
            '\u{a0}' | '\u{202f}' | '\u{2009}' | '\u{2007}' => Some(' '),
            '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}' => None,
            '\r' => Some('\n'),
            other => Some(other),
        })
        .collect()
}

fn collapse_layout(text: &str) -> String {
    let s = HORIZONTAL_WS_RE.replace_all(text, " ");
    let s = SPACED_NEWLINE_RE.replace_all(&s, "\n");
    BLANK_LINES_RE.replace_all(&s, "\n").into_owned()
}

/// Collapse substrings of `min..=max` characters that are immediately
/// repeated (optionally separated by a single whitespace character) into
/// one occurrence. The shortest repeating unit at the left-most position wins.
pub fn collapse_immediate_repeats(text: &str, min: usize, max: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < n {
        let unit_len = (min..=max)
            .take_while(|len| i + 2 * len <= n)
            .find(|&len| next_copy(&chars, i, len, i + len).is_some());

        match unit_len {
            Some(len) => {
                out.extend(&chars[i..i + len]);
                let mut end = i + len;
                while let Some(copy_end) = next_copy(&chars, i, len, end) {
                    end = copy_end;
                }
                i = end;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }

    out
}

/// If a copy of `chars[unit..unit+len]` starts at `at` (or one whitespace
/// character later), return the index just past it.
fn next_copy(chars: &[char], unit: usize, len: usize, at: usize) -> Option<usize> {
    let pattern = &chars[unit..unit + len];
    let matches_at = |start: usize| chars.get(start..start + len).is_some_and(|s| s == pattern);

    if matches_at(at) {
        Some(at + len)
    } else if chars.get(at).is_some_and(|c| c.is_whitespace()) && matches_at(at + 1) {
        Some(at + 1 + len)
    } else {
        None
    }
}
