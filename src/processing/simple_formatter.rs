//! Deterministic fallback used when output is too long to pass through and
//! the AI path is disabled or failed.

use crate::utils::text::{char_len, strip_ansi, take_chars, tidy_lines};

/// Appended inside the code block when the output was clipped.
pub const TRUNCATION_MARKER: &str = "\n... (output truncated)";

const CODE_FENCE: &str = "```";

/// Cleans `raw_text`, clips it to `max_chars` characters and wraps it in a
/// fixed-width code block. Never fails.
///
/// # Examples
///
/// ```
/// use chatops_relay::processing::simple_formatter::format;
///
/// assert_eq!(format("plan ok\n", 100), "```\nplan ok\n```");
/// assert!(format(&"x".repeat(50), 10).contains("(output truncated)"));
/// ```
#[must_use]
pub fn format(raw_text: &str, max_chars: usize) -> String {
    // An embedded fence would close our block early.
    let cleaned = tidy_lines(&strip_ansi(raw_text)).replace(CODE_FENCE, "'''");

    let body = if cleaned.is_empty() {
        "(no output)".to_string()
    } else if char_len(&cleaned) > max_chars {
        format!("{}{TRUNCATION_MARKER}", take_chars(&cleaned, max_chars).trim_end())
    } else {
        cleaned
    };

    format!("{CODE_FENCE}\n{body}\n{CODE_FENCE}")
}
