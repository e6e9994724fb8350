//! Instruction templates and bounded prompt assembly for the summarizer.

use crate::core::models::{CommandKind, Section};
use crate::utils::text::{char_len, take_chars};

/// Default character budget for the rendered sections.
pub const DEFAULT_PROMPT_MAX_CHARS: usize = 4000;

const CLIPPED_NOTE: &str = "\n[remaining output clipped]";

const STATUS_TEMPLATE: &str = "You summarise Terraform output for a chat message read on a phone.\n\
Rules:\n\
1. Report how many resources are managed and group them by resource type with counts.\n\
2. Quote every error and warning verbatim.\n\
3. Use short bullet points and at most 15 lines. Do not invent resources that are not in the output.\n\
4. Output only the summary.\n\
\n\
Terraform output:\n";

const DESTROY_TEMPLATE: &str = "You summarise a Terraform DESTROY PLAN for a chat message read on a phone.\n\
Nothing has been destroyed yet; this is what WOULD be destroyed.\n\
Rules:\n\
1. State how many resources would be destroyed and group them by resource type with counts.\n\
2. Call out anything that looks stateful or irreversible (databases, buckets, volumes).\n\
3. Quote every error and warning verbatim.\n\
4. End by reminding the user to send /confirm_destroy to proceed.\n\
5. Use short bullet points and at most 15 lines. Output only the summary.\n\
\n\
Terraform plan output:\n";

const CONFIRM_DESTROY_TEMPLATE: &str = "You summarise the RESULT of a Terraform destroy run for a chat message read on a phone.\n\
This is what actually happened, not a plan.\n\
Rules:\n\
1. First line: whether the destroy succeeded, partially succeeded or failed.\n\
2. List how many resources were actually destroyed, grouped by resource type.\n\
3. Quote every error raised during destruction verbatim and name the resources left behind.\n\
4. Use short bullet points and at most 15 lines. Output only the summary.\n\
\n\
Terraform apply output:\n";

/// Instruction template for a command kind.
#[must_use]
pub fn template_for(command_kind: CommandKind) -> &'static str {
    match command_kind {
        CommandKind::Status => STATUS_TEMPLATE,
        CommandKind::Destroy => DESTROY_TEMPLATE,
        CommandKind::ConfirmDestroy => CONFIRM_DESTROY_TEMPLATE,
    }
}

/// Template followed by as many whole sections as fit in `max_chars`.
///
/// Sections are not cut; the first one that does not fit ends the listing.
/// The one exception is a first section that alone exceeds the budget, which
/// is clipped at its last line break within budget so the model always sees
/// some output. The result is at most `max_chars` characters longer than the
/// template.
#[must_use]
pub fn build(sections: &[Section], command_kind: CommandKind, max_chars: usize) -> String {
    let template = template_for(command_kind);
    let mut body = String::new();
    let mut used = 0usize;
    let mut included = 0usize;

    for section in sections {
        let text = sanitize_section(&section.body);
        let separator = usize::from(included > 0);
        let len = char_len(&text) + separator;
        if used + len > max_chars {
            if included == 0 {
                body = clip_first_section(&text, max_chars);
            }
            break;
        }
        if separator == 1 {
            body.push('\n');
        }
        body.push_str(&text);
        used += len;
        included += 1;
    }

    if included == 0 && !body.is_empty() {
        return format!("{template}{body}");
    }

    let omitted = sections.len() - included;
    if omitted > 0 {
        let note = format!("\n[{omitted} more section(s) omitted]");
        if used + char_len(&note) <= max_chars {
            body.push_str(&note);
        }
    }

    format!("{template}{body}")
}

/// Whole lines of `text` within `max_chars`, followed by a clip note when it
/// fits. A first line longer than the budget is cut at the character limit.
fn clip_first_section(text: &str, max_chars: usize) -> String {
    let note_len = char_len(CLIPPED_NOTE);
    let (budget, with_note) = if max_chars > note_len * 2 {
        (max_chars - note_len, true)
    } else {
        (max_chars, false)
    };

    let head = take_chars(text, budget);
    let clipped = match head.rfind('\n') {
        Some(idx) if idx > 0 => &head[..idx],
        _ => head,
    }
    .trim_end();

    if clipped.is_empty() {
        return String::new();
    }
    if with_note {
        format!("{clipped}{CLIPPED_NOTE}")
    } else {
        clipped.to_string()
    }
}

/// Control characters other than newlines and tabs are dropped.
fn sanitize_section(body: &str) -> String {
    body.chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect()
}
