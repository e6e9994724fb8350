//! Structured facts pulled out of normalized sections.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::models::{
    CommandKind, CompletionStatus, ExtractedSummary, ResourceAction, Section, SectionKind,
};

pub const SUCCESS_MARKERS: [&str; 1] = ["Destroy complete"];
pub const FAILURE_MARKERS: [&str; 2] = ["Error applying", "Error destroying"];

static DESTROYED_TOTAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Resources:\s*(\d+)\s+destroyed").expect("static regex compile"));

static DESTRUCTION_COMPLETE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\S+): Destruction complete").expect("static regex compile")
});

/// # Examples
///
/// ```
/// use chatops_relay::core::models::{CommandKind, ResourceAction};
/// use chatops_relay::processing::{extractor::extract, normalizer::normalize};
///
/// let sections = normalize("Resource: aws_instance.web (will be destroyed)\n");
/// let summary = extract(&sections, CommandKind::Destroy);
/// assert_eq!(summary.count(ResourceAction::Destroy), 1);
/// ```
#[must_use]
pub fn extract(sections: &[Section], command_kind: CommandKind) -> ExtractedSummary {
    let mut summary = ExtractedSummary::default();

    for section in sections {
        match section.kind {
            SectionKind::Error => summary.errors.push(section.first_line().trim().to_string()),
            SectionKind::Warning => summary.warnings.push(section.first_line().trim().to_string()),
            SectionKind::ResourceList | SectionKind::Other => {}
        }
    }

    match command_kind {
        CommandKind::Status | CommandKind::Destroy => aggregate_plan(sections, &mut summary),
        CommandKind::ConfirmDestroy => aggregate_destroy_result(sections, &mut summary),
    }

    summary
}

/// Counts resource-list sections by the action named on their marker line.
fn aggregate_plan(sections: &[Section], summary: &mut ExtractedSummary) {
    for section in sections.iter().filter(|s| s.kind == SectionKind::ResourceList) {
        for action in actions_for(section) {
            *summary.resource_counts.entry(action).or_insert(0) += 1;
        }
        *summary
            .resource_types
            .entry(resource_type(&section.key).to_string())
            .or_insert(0) += 1;
    }
}

/// Reads apply-phase markers only; plan-shaped sections are ignored because
/// they describe intent, not what actually happened.
fn aggregate_destroy_result(sections: &[Section], summary: &mut ExtractedSummary) {
    let mut succeeded = false;
    let mut failed = false;
    let mut reported_total: Option<usize> = None;
    let mut destroyed: BTreeSet<&str> = BTreeSet::new();

    for section in sections.iter().filter(|s| s.kind != SectionKind::ResourceList) {
        for line in section.body.lines() {
            let line = line.trim();
            if SUCCESS_MARKERS.iter().any(|m| line.contains(m)) {
                succeeded = true;
            }
            if FAILURE_MARKERS.iter().any(|m| line.contains(m)) {
                failed = true;
            }
            if let Some(caps) = DESTROYED_TOTAL_RE.captures(line)
                && let Ok(n) = caps[1].parse::<usize>()
            {
                reported_total = Some(n);
            }
            if let Some(caps) = DESTRUCTION_COMPLETE_RE.captures(line)
                && let Some(addr) = caps.get(1)
            {
                destroyed.insert(addr.as_str());
            }
        }
    }

    let mut types: BTreeMap<String, usize> = BTreeMap::new();
    for addr in &destroyed {
        *types.entry(resource_type(addr).to_string()).or_insert(0) += 1;
    }
    let count = reported_total.unwrap_or(destroyed.len());
    if count > 0 {
        summary.resource_counts.insert(ResourceAction::Destroy, count);
    }
    summary.resource_types = types;

    summary.completion_status = match (succeeded, failed) {
        (true, true) => CompletionStatus::Partial,
        (true, false) => CompletionStatus::Success,
        (false, true) => CompletionStatus::Failed,
        (false, false) => CompletionStatus::Unknown,
    };
}

/// Action(s) named after the address on the section's marker line. A
/// replacement is both a create and a destroy, as in Terraform's plan totals.
fn actions_for(section: &Section) -> Vec<ResourceAction> {
    let first = section.first_line();
    let rest = first
        .find(section.key.as_str())
        .map_or(first, |idx| &first[idx + section.key.len()..])
        .to_ascii_lowercase();

    if rest.contains("replace") {
        vec![ResourceAction::Create, ResourceAction::Destroy]
    } else if rest.contains("destroy") {
        vec![ResourceAction::Destroy]
    } else if rest.contains("create") {
        vec![ResourceAction::Create]
    } else if rest.contains("update") || rest.contains("changed") {
        vec![ResourceAction::Update]
    } else {
        vec![ResourceAction::NoOp]
    }
}

/// Resource type of an address, skipping `module.<name>` and `data` prefixes.
#[must_use]
pub fn resource_type(address: &str) -> &str {
    let mut parts = address.split('.');
    while let Some(part) = parts.next() {
        if part == "module" || part.starts_with("module[") {
            parts.next();
            continue;
        }
        if part == "data" {
            continue;
        }
        return part;
    }
    address
}
