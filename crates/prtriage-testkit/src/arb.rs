//! Proptest strategies for generating valid test inputs.
//!
//! Strategies are constructive: generated hunks, lines and conflict blocks are
//! always well-formed, so tests never lean on `prop_filter` rejection.

use prtriage_types::{Category, Issue, IssueType, Severity};
use proptest::prelude::*;

use crate::diff_builder::{FileBuilder, HunkBuilder};

/// Maximum number of hunks per file
pub const MAX_HUNKS_PER_FILE: usize = 5;

/// Maximum number of lines per hunk
pub const MAX_LINES_PER_HUNK: usize = 20;

// =============================================================================
// Enum Strategies
// =============================================================================

pub fn arb_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::High),
        Just(Severity::Medium),
        Just(Severity::Low),
    ]
}

pub fn arb_issue_type() -> impl Strategy<Value = IssueType> {
    prop_oneof![
        Just(IssueType::Error),
        Just(IssueType::Warning),
        Just(IssueType::Info),
    ]
}

pub fn arb_category() -> impl Strategy<Value = Category> {
    prop_oneof![
        Just(Category::Security),
        Just(Category::Performance),
        Just(Category::Format),
        Just(Category::Lint),
        Just(Category::BestPractice),
    ]
}

// =============================================================================
// Source text
// =============================================================================

/// A file path with a JavaScript or TypeScript extension.
pub fn arb_source_path() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-z][a-z0-9_]{0,7}", 1..3),
        prop::sample::select(vec!["js", "ts", "jsx", "mjs"]),
    )
        .prop_map(|(parts, ext)| format!("{}.{}", parts.join("/"), ext))
}

/// Printable line content that never starts with a diff marker or a conflict marker.
pub fn arb_line_content() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_(){};:,.=*/& ]{0,60}".prop_map(|s| format!("x{s}"))
}

// =============================================================================
// Diff strategies
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Kind {
    Context,
    Add,
    Remove,
}

fn arb_kind() -> impl Strategy<Value = Kind> {
    prop_oneof![Just(Kind::Context), Just(Kind::Add), Just(Kind::Remove)]
}

/// A single hunk starting at `new_start` with a random mix of line kinds.
pub fn arb_hunk(new_start: u32) -> impl Strategy<Value = HunkBuilder> {
    prop::collection::vec((arb_kind(), arb_line_content()), 1..MAX_LINES_PER_HUNK).prop_map(
        move |lines| {
            lines
                .iter()
                .fold(HunkBuilder::at(new_start), |hunk, (kind, text)| match kind {
                    Kind::Context => hunk.context(text),
                    Kind::Add => hunk.add(text),
                    Kind::Remove => hunk.remove(text),
                })
        },
    )
}

/// A file with up to `MAX_HUNKS_PER_FILE` non-overlapping hunks.
pub fn arb_file(path: String) -> impl Strategy<Value = FileBuilder> {
    prop::collection::vec(0u32..40, 1..MAX_HUNKS_PER_FILE)
        .prop_flat_map(|gaps| {
            // Each hunk gets a 100-line band so hunks never overlap.
            let hunks: Vec<_> = gaps
                .iter()
                .enumerate()
                .map(|(i, gap)| arb_hunk(1 + i as u32 * 100 + gap))
                .collect();
            hunks
        })
        .prop_map(move |hunks| {
            hunks
                .into_iter()
                .fold(FileBuilder::new(&path), FileBuilder::hunk)
        })
}

// =============================================================================
// Conflicts
// =============================================================================

/// One side of a conflict block: a few content lines.
pub fn arb_conflict_side() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_line_content(), 0..5)
}

/// A file containing exactly one terminated conflict block between plain lines.
pub fn arb_conflicted_text() -> impl Strategy<Value = (String, Vec<String>, Vec<String>)> {
    (
        prop::collection::vec(arb_line_content(), 0..4),
        arb_conflict_side(),
        arb_conflict_side(),
        prop::collection::vec(arb_line_content(), 0..4),
    )
        .prop_map(|(before, ours, theirs, after)| {
            let mut lines = before;
            lines.push("<<<<<<< HEAD".to_string());
            lines.extend(ours.iter().cloned());
            lines.push("=======".to_string());
            lines.extend(theirs.iter().cloned());
            lines.push(">>>>>>> feature".to_string());
            lines.extend(after);
            (format!("{}\n", lines.join("\n")), ours, theirs)
        })
}

// =============================================================================
// Issues
// =============================================================================

prop_compose! {
    /// A well-formed finding with an arbitrary hash and no fix.
    pub fn arb_issue()(
        hash in "[0-9a-f]{16}",
        issue_type in arb_issue_type(),
        severity in arb_severity(),
        category in arb_category(),
        file in arb_source_path(),
        line in 1u32..500,
        message in "[A-Za-z ]{1,40}",
        rule in proptest::option::of("[a-z-]{3,20}"),
    ) -> Issue {
        Issue {
            id: format!("{hash}-0"),
            hash,
            issue_type,
            severity,
            category,
            file,
            line,
            column: None,
            message,
            rule,
            suggestion: None,
            fixable: false,
            original_code: String::new(),
            suggested_code: None,
        }
    }
}
