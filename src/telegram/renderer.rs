//! Turns pipeline output into a Telegram message that is valid for its parse
//! mode and fits the message length limit.

use tracing::debug;

use crate::core::models::{
    CommandKind, CompletionStatus, ExtractedSummary, MessageFormat, RenderedMessage,
    ResourceAction,
};
use crate::utils::text::{char_len, take_chars};

/// Appended on its own line when a message had to be clipped.
pub const TRUNCATION_NOTICE: &str = "(message truncated)";

const FENCE: &str = "```";
const MARKDOWN_V2_RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    '\\',
];
const MAX_LISTED_TYPES: usize = 8;

/// Renders `content` for `format`, clipped to `max_len` characters.
///
/// Legacy Markdown that would be rejected by the chat surface is sent as plain
/// text instead; MarkdownV2 content is escaped so that only code spans and
/// blocks keep their meaning. Never fails.
#[must_use]
pub fn render(content: &str, format: MessageFormat, max_len: usize) -> RenderedMessage {
    let (text, format) = match format {
        MessageFormat::Plain => (content.to_string(), MessageFormat::Plain),
        MessageFormat::Markdown if is_valid_markdown(content) => {
            (content.to_string(), MessageFormat::Markdown)
        }
        MessageFormat::Markdown => {
            debug!("Unbalanced Markdown entities, rendering as plain text");
            (content.to_string(), MessageFormat::Plain)
        }
        MessageFormat::MarkdownV2 => (escape_markdown_v2(content), MessageFormat::MarkdownV2),
    };

    if char_len(&text) <= max_len {
        return RenderedMessage {
            text,
            truncated: false,
            format,
        };
    }
    clip(&text, format, max_len)
}

fn clip(text: &str, format: MessageFormat, max_len: usize) -> RenderedMessage {
    let notice = match format {
        MessageFormat::MarkdownV2 => format!("\n\n{}", escape_all_v2(TRUNCATION_NOTICE)),
        MessageFormat::Markdown | MessageFormat::Plain => format!("\n\n{TRUNCATION_NOTICE}"),
    };
    // Room for the notice plus a closing "\n```".
    let reserve = char_len(&notice) + FENCE.len() + 1;

    if max_len <= reserve {
        return RenderedMessage {
            text: take_chars(text, max_len).to_string(),
            truncated: true,
            format: MessageFormat::Plain,
        };
    }

    let mut body = take_chars(text, max_len - reserve).to_string();
    let mut format = format;

    if format != MessageFormat::Plain {
        let trailing_backslashes = body.chars().rev().take_while(|&c| c == '\\').count();
        if trailing_backslashes % 2 == 1 {
            body.pop();
        }
        body.push_str(match scan(&body, true).state {
            CodeState::Pre => "\n```",
            CodeState::Inline => "`",
            CodeState::Text => "",
        });
        if format == MessageFormat::Markdown && !is_valid_markdown(&body) {
            format = MessageFormat::Plain;
        }
    }

    body.push_str(&notice);
    RenderedMessage {
        text: body,
        truncated: true,
        format,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeState {
    Text,
    Inline,
    Pre,
}

struct Scan {
    state: CodeState,
    stars: usize,
    underscores: usize,
    open_link: bool,
}

fn fence_at(chars: &[char], i: usize) -> bool {
    chars.len() >= i + 3 && chars[i..i + 3] == ['`', '`', '`']
}

fn scan(text: &str, honor_escapes: bool) -> Scan {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Scan {
        state: CodeState::Text,
        stars: 0,
        underscores: 0,
        open_link: false,
    };
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if honor_escapes && c == '\\' {
            i += 2;
            continue;
        }
        match out.state {
            CodeState::Text => {
                if fence_at(&chars, i) {
                    out.state = CodeState::Pre;
                    i += 3;
                    continue;
                }
                match c {
                    '`' => out.state = CodeState::Inline,
                    '*' => out.stars += 1,
                    '_' => out.underscores += 1,
                    '[' => out.open_link = true,
                    ']' => out.open_link = false,
                    _ => {}
                }
            }
            CodeState::Inline => {
                if c == '`' {
                    out.state = CodeState::Text;
                }
            }
            CodeState::Pre => {
                if fence_at(&chars, i) {
                    out.state = CodeState::Text;
                    i += 3;
                    continue;
                }
            }
        }
        i += 1;
    }
    out
}

/// Whether Telegram's legacy Markdown parser would accept `text`.
#[must_use]
pub fn is_valid_markdown(text: &str) -> bool {
    let s = scan(text, true);
    s.state == CodeState::Text && s.stars % 2 == 0 && s.underscores % 2 == 0 && !s.open_link
}

/// Escapes `text` for MarkdownV2, keeping balanced code spans and blocks.
/// Unbalanced backticks make the whole text literal.
#[must_use]
pub fn escape_markdown_v2(text: &str) -> String {
    if scan(text, false).state != CodeState::Text {
        return escape_all_v2(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut state = CodeState::Text;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match state {
            CodeState::Text => {
                if fence_at(&chars, i) {
                    out.push_str(FENCE);
                    state = CodeState::Pre;
                    i += 3;
                    continue;
                }
                if c == '`' {
                    state = CodeState::Inline;
                } else if MARKDOWN_V2_RESERVED.contains(&c) {
                    out.push('\\');
                }
                out.push(c);
            }
            CodeState::Inline => {
                if c == '`' {
                    state = CodeState::Text;
                } else if c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            CodeState::Pre => {
                if fence_at(&chars, i) {
                    out.push_str(FENCE);
                    state = CodeState::Text;
                    i += 3;
                    continue;
                }
                if c == '\\' || c == '`' {
                    out.push('\\');
                }
                out.push(c);
            }
        }
        i += 1;
    }
    out
}

fn escape_all_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if MARKDOWN_V2_RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn status_label(status: CompletionStatus) -> &'static str {
    match status {
        CompletionStatus::Success => "✅ succeeded",
        CompletionStatus::Partial => "⚠️ partially succeeded",
        CompletionStatus::Failed => "❌ failed",
        CompletionStatus::Unknown => "❔ unknown",
    }
}

/// Legacy Markdown bold; MarkdownV2 content is escaped before sending, so
/// headings there are left unstyled rather than shown with literal asterisks.
fn heading(text: &str, format: MessageFormat) -> String {
    match format {
        MessageFormat::Markdown => format!("*{text}*"),
        MessageFormat::MarkdownV2 | MessageFormat::Plain => text.to_string(),
    }
}

fn code(text: &str, format: MessageFormat) -> String {
    match format {
        MessageFormat::Markdown | MessageFormat::MarkdownV2 => format!("`{text}`"),
        MessageFormat::Plain => text.to_string(),
    }
}

/// Header of extracted facts followed by the model's summary, marked up for
/// `format`.
///
/// A destroy plan is labelled as such so it is never mistaken for applied
/// state.
#[must_use]
pub fn compose_summary(
    summary: &ExtractedSummary,
    kind: CommandKind,
    ai_text: &str,
    format: MessageFormat,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    match kind {
        CommandKind::Status => {
            lines.push(heading("Infrastructure status", format));
            lines.push(format!("Resources: {}", summary.total_resources()));
        }
        CommandKind::Destroy => {
            lines.push(format!(
                "{} (nothing has been destroyed yet)",
                heading("Destroy plan", format)
            ));
            lines.push(format!(
                "Planned: {} to destroy",
                summary.count(ResourceAction::Destroy)
            ));
            let create = summary.count(ResourceAction::Create);
            let update = summary.count(ResourceAction::Update);
            if create + update > 0 {
                lines.push(format!("Also: {create} to create, {update} to update"));
            }
        }
        CommandKind::ConfirmDestroy => {
            lines.push(format!(
                "{} {}",
                heading("Destroy result:", format),
                status_label(summary.completion_status)
            ));
            lines.push(format!(
                "Destroyed: {}",
                summary.count(ResourceAction::Destroy)
            ));
        }
    }

    if !summary.resource_types.is_empty() {
        let mut types: Vec<(&String, &usize)> = summary.resource_types.iter().collect();
        types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let mut listed: Vec<String> = types
            .iter()
            .take(MAX_LISTED_TYPES)
            .map(|(name, count)| format!("{} ×{count}", code(name, format)))
            .collect();
        if types.len() > MAX_LISTED_TYPES {
            listed.push(format!("+{} more", types.len() - MAX_LISTED_TYPES));
        }
        lines.push(format!("Types: {}", listed.join(", ")));
    }
    if !summary.errors.is_empty() {
        lines.push(format!("Errors: {}", summary.errors.len()));
    }
    if !summary.warnings.is_empty() {
        lines.push(format!("Warnings: {}", summary.warnings.len()));
    }

    let header = lines.join("\n");
    let body = ai_text.trim();
    if body.is_empty() {
        header
    } else {
        format!("{header}\n\n{body}")
    }
}
