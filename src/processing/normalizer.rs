//! Splits raw Terraform/workflow output into deduplicated sections.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::core::models::{Section, SectionKind};
use crate::utils::text::{collapse_whitespace, strip_ansi};

static RESOURCE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Resource:\s*([^\s(]+)").expect("static regex compile"));

static PLAN_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\s+(\S+)\s+(?:will|must)\s+be\b").expect("static regex compile")
});

// Provider-prefixed type (`aws_instance`) keeps prose like `example.com` out.
static BARE_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:module\.[A-Za-z0-9_-]+(?:\[[^\]]+\])?\.)*(?:data\.)?[a-z][a-z0-9]*_[a-z0-9_]+\.[A-Za-z0-9_-]+(?:\[[^\]]+\])?$",
    )
    .expect("static regex compile")
});

static OUTCOME_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Plan:|Destroy complete!|Apply complete!|No changes\.|Changes to Outputs:)")
        .expect("static regex compile")
});

static PROGRESS_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\S+: (?:Destroying\.\.\.|Destruction complete|Creating\.\.\.|Creation complete|Modifying\.\.\.|Modifications complete)",
    )
    .expect("static regex compile")
});

static STILL_WORKING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\S+: Still (?:destroying|creating|modifying|reading)\.\.\.")
        .expect("static regex compile")
});

/// Splits `raw_text` into sections, dropping later duplicates of a
/// `(kind, key)` pair. Output without any recognised marker comes back as a
/// single `Other` section.
#[must_use]
pub fn normalize(raw_text: &str) -> Vec<Section> {
    let cleaned = strip_ansi(raw_text);
    let mut builder = SectionBuilder::default();

    for line in cleaned.lines().filter_map(clean_line) {
        match classify(&line) {
            Some((kind, key)) => builder.start(kind, key, line),
            None => builder.push(line),
        }
    }

    let sections = builder.finish();
    let mut seen: HashSet<(SectionKind, String)> = HashSet::new();
    sections
        .into_iter()
        .filter(|section| seen.insert((section.kind, section.key.clone())))
        .collect()
}

/// Joins section bodies back into text. Feeding the result to [`normalize`]
/// yields the same sections.
#[must_use]
pub fn render_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|s| s.body.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strips per-line noise; `None` drops the line entirely.
fn clean_line(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let line = if let Some(rest) = trimmed.strip_prefix('│') {
        rest.strip_prefix(' ').unwrap_or(rest)
    } else {
        line
    };
    let line = line.trim_end();

    let head = line.trim_start();
    if head == "╷" || head == "╵" || STILL_WORKING_RE.is_match(head) {
        return None;
    }
    Some(line.to_string())
}

fn classify(line: &str) -> Option<(SectionKind, String)> {
    let head = line.trim_start();
    if head.is_empty() {
        return None;
    }

    if let Some(caps) = RESOURCE_MARKER_RE.captures(head) {
        return Some((SectionKind::ResourceList, caps[1].to_string()));
    }
    if let Some(caps) = PLAN_MARKER_RE.captures(head) {
        return Some((SectionKind::ResourceList, caps[1].to_string()));
    }
    if BARE_ADDRESS_RE.is_match(head) {
        return Some((SectionKind::ResourceList, head.to_string()));
    }
    if head.starts_with("Error:") {
        return Some((SectionKind::Error, collapse_whitespace(head)));
    }
    if head.starts_with("Warning:") {
        return Some((SectionKind::Warning, collapse_whitespace(head)));
    }
    if OUTCOME_MARKER_RE.is_match(head) || PROGRESS_MARKER_RE.is_match(head) {
        return Some((SectionKind::Other, collapse_whitespace(head)));
    }
    None
}

#[derive(Default)]
struct SectionBuilder {
    current: Option<(SectionKind, String, Vec<String>)>,
    done: Vec<Section>,
}

impl SectionBuilder {
    fn start(&mut self, kind: SectionKind, key: String, line: String) {
        self.flush();
        self.current = Some((kind, key, vec![line]));
    }

    fn push(&mut self, line: String) {
        match &mut self.current {
            Some((_, _, lines)) => lines.push(line),
            // Leading blank lines never open the preamble.
            None if line.trim().is_empty() => {}
            None => {
                let key = collapse_whitespace(&line);
                self.current = Some((SectionKind::Other, key, vec![line]));
            }
        }
    }

    fn flush(&mut self) {
        let Some((kind, key, lines)) = self.current.take() else {
            return;
        };

        let mut body: Vec<String> = Vec::with_capacity(lines.len());
        for line in lines {
            if line.is_empty() && body.last().is_some_and(|prev: &String| prev.is_empty()) {
                continue;
            }
            body.push(line);
        }
        while body.last().is_some_and(|l| l.is_empty()) {
            body.pop();
        }

        if !body.is_empty() {
            self.done.push(Section {
                kind,
                key,
                body: body.join("\n"),
            });
        }
    }

    fn finish(mut self) -> Vec<Section> {
        self.flush();
        self.done
    }
}
