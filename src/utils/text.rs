//! Character-level helpers shared by the formatting stages.
//!
//! Every length in this crate is counted in `char`s, never bytes, so slicing
//! never lands inside a multi-byte sequence.

use once_cell::sync::Lazy;
use regex::Regex;

static ANSI_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("static regex compile"));

#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// First `max_chars` characters of `text`.
#[must_use]
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Removes terminal colour and cursor sequences.
#[must_use]
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE_RE.replace_all(text, "").into_owned()
}

/// Trims and collapses every run of whitespace into one space.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trailing whitespace removed from every line, runs of blank lines collapsed
/// to one, and blank lines at either end dropped.
#[must_use]
pub fn tidy_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() && out.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
