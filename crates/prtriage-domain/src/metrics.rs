//! File-level metrics and the reporting severity filter.

use prtriage_types::{Category, Issue, Metrics, Severity};

use crate::preprocess::Language;
use crate::rules::find_word_from;
use crate::source::SourceFile;

const DECISION_WORDS: &[&str] = &["if", "for", "while", "case", "catch"];

/// Only high and medium findings are reported.
pub fn is_reported(issue: &Issue) -> bool {
    matches!(issue.severity, Severity::High | Severity::Medium)
}

/// `1 +` the decision points in the file's code, comments and strings excluded.
pub fn complexity(content: &str, language: Language) -> u32 {
    let file = SourceFile::new(content, language);
    let points: usize = file.lines.iter().map(|l| decision_points(&l.masked)).sum();
    u32::try_from(points).unwrap_or(u32::MAX).saturating_add(1)
}

fn decision_points(masked: &str) -> usize {
    let words: usize = DECISION_WORDS
        .iter()
        .map(|w| {
            let mut n = 0;
            let mut from = 0;
            while let Some(at) = find_word_from(masked, w, from) {
                n += 1;
                from = at + w.len();
            }
            n
        })
        .sum();
    words + masked.matches("&&").count() + masked.matches("||").count() + ternaries(masked)
}

/// `?` used as a conditional, not `?.`, `??` or an optional marker `?:`.
fn ternaries(masked: &str) -> usize {
    let b = masked.as_bytes();
    (0..b.len())
        .filter(|&i| b[i] == b'?')
        .filter(|&i| i == 0 || b[i - 1] != b'?')
        .filter(|&i| !matches!(b.get(i + 1), Some(b'.' | b'?' | b':')))
        .count()
}

/// Metrics over the reported findings of one file.
pub fn compute(content: &str, language: Language, issues: &[Issue]) -> Metrics {
    let complexity = complexity(content, language);
    let (high, medium) = severity_counts(issues.iter());
    let maintainability = 100u32
        .saturating_sub(high.saturating_mul(10))
        .saturating_sub(medium.saturating_mul(5))
        .saturating_sub(complexity / 5);

    let (perf_high, perf_medium) =
        severity_counts(issues.iter().filter(|i| i.category == Category::Performance));
    let performance_score = 100u32
        .saturating_sub(perf_high.saturating_mul(30))
        .saturating_sub(perf_medium.saturating_mul(5));

    Metrics {
        complexity,
        maintainability,
        performance_score: Some(performance_score),
    }
}

fn severity_counts<'a>(issues: impl Iterator<Item = &'a Issue>) -> (u32, u32) {
    issues.fold((0u32, 0u32), |(h, m), i| match i.severity {
        Severity::High => (h.saturating_add(1), m),
        Severity::Medium => (h, m.saturating_add(1)),
        Severity::Low => (h, m),
    })
}

/// One summary line per category that has findings, plus a note on fixes.
pub fn suggestions(issues: &[Issue]) -> Vec<String> {
    let count = |cat: Category| issues.iter().filter(|i| i.category == cat).count();
    let mut out = Vec::new();

    let per_category = [
        (Category::Security, "Fix {n} security issue(s) before merging"),
        (Category::Performance, "Address {n} performance issue(s)"),
        (Category::Lint, "Clean up {n} lint issue(s)"),
        (Category::BestPractice, "Follow up on {n} best-practice issue(s)"),
        (Category::Format, "Run a formatter to clear {n} formatting issue(s)"),
    ];
    for (cat, template) in per_category {
        let n = count(cat);
        if n > 0 {
            out.push(template.replace("{n}", &n.to_string()));
        }
    }

    let fixable = issues.iter().filter(|i| i.fixable).count();
    if fixable > 0 {
        out.push(format!("{fixable} issue(s) have an automatic fix"));
    }
    out
}
