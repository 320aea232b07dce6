//! Applying suggested replacements back onto a file.
//!
//! Fixes are best-effort textual rewrites. Each one replaces exactly the line
//! it was reported on, and only if that line still reads (trimmed) as it did
//! at analysis time. A fix that no longer matches is counted as skipped; it
//! never aborts the others. There is no atomicity across fixes, and a
//! replacement is not checked for syntactic validity.

use prtriage_types::Issue;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FixOutcome {
    pub content: String,
    pub applied: u32,
    pub skipped: u32,
}

/// Apply every fixable issue's `suggested_code` to `content`.
///
/// Issues are applied from the bottom of the file up so earlier line numbers
/// stay valid when a replacement spans several lines.
pub fn apply_fixes(content: &str, issues: &[Issue]) -> FixOutcome {
    let mut fixable: Vec<&Issue> = issues
        .iter()
        .filter(|i| i.fixable && i.suggested_code.as_deref().is_some_and(|s| !s.is_empty()))
        .collect();
    if fixable.is_empty() {
        return FixOutcome {
            content: content.to_string(),
            ..FixOutcome::default()
        };
    }
    fixable.sort_by(|a, b| b.line.cmp(&a.line));

    let eol = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let trailing_newline = content.ends_with('\n');
    let mut lines: Vec<String> = content
        .lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
        .collect();

    let (mut applied, mut skipped) = (0u32, 0u32);
    for issue in fixable {
        let idx = (issue.line as usize).wrapping_sub(1);
        let current = lines.get(idx).map(|l| l.trim());
        if current != Some(issue.original_code.trim()) {
            debug!(
                file = %issue.file,
                line = issue.line,
                rule = issue.rule_or_type(),
                "skipping stale fix"
            );
            skipped += 1;
            continue;
        }
        let replacement = issue.suggested_code.as_deref().unwrap_or_default();
        lines.splice(idx..=idx, replacement.lines().map(str::to_string));
        applied += 1;
    }

    let mut out = lines.join(eol);
    if trailing_newline {
        out.push_str(eol);
    }
    FixOutcome {
        content: out,
        applied,
        skipped,
    }
}
