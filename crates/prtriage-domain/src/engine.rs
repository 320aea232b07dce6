//! Runs the rule catalog over one file.

use std::collections::BTreeSet;

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use prtriage_types::{AnalysisConfig, Issue};

use crate::identity::issue_hash;
use crate::preprocess::Language;
use crate::rules::{LineContext, Rule, RuleHit};
use crate::source::SourceFile;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("content contains NUL bytes")]
    BinaryContent,

    #[error("content is {size} bytes, over the {limit}-byte limit")]
    TooLarge { size: u64, limit: u64 },
}

/// Detect a file's language from its path.
pub fn detect_language(path: &str) -> Language {
    Language::from_path(path)
}

/// Evaluate `rules` over `content`.
///
/// When `filter` is given, only the listed 1-based lines may produce issues;
/// rules still read the rest of the file for context. Files in a language
/// outside JavaScript/TypeScript only see the cross-language rules.
pub fn analyze_source(
    content: &str,
    filename: &str,
    language: Language,
    rules: &[Box<dyn Rule>],
    settings: &AnalysisConfig,
    filter: Option<&BTreeSet<u32>>,
) -> Result<Vec<Issue>, AnalysisError> {
    let size = content.len() as u64;
    if size > settings.max_file_bytes {
        return Err(AnalysisError::TooLarge {
            size,
            limit: settings.max_file_bytes,
        });
    }
    if content.contains('\0') {
        return Err(AnalysisError::BinaryContent);
    }

    let file = SourceFile::new(content, language);
    let active: Vec<&dyn Rule> = rules
        .iter()
        .map(|r| r.as_ref())
        .filter(|r| language.is_supported() || r.cross_language())
        .collect();
    let stamp = Utc::now().timestamp_millis();

    let mut issues = Vec::new();
    for index in 0..file.lines.len() {
        let cx = LineContext {
            file: &file,
            index,
            settings,
        };
        let line = cx.line_no();
        if filter.is_some_and(|f| !f.contains(&line)) {
            continue;
        }
        let comment_only = cx.line().is_comment();

        for rule in &active {
            if comment_only && !rule.inspects_comments() {
                continue;
            }
            if let Some(hit) = rule.check(&cx) {
                issues.push(to_issue(*rule, hit, filename, line, cx.raw(), stamp));
            }
        }
    }

    debug!(
        file = filename,
        language = %language,
        rules = active.len(),
        issues = issues.len(),
        "analyzed source"
    );
    Ok(issues)
}

fn to_issue(rule: &dyn Rule, hit: RuleHit, file: &str, line: u32, raw: &str, stamp: i64) -> Issue {
    let hash = issue_hash(file, line, rule.id(), &hit.message);
    let suggested_code = hit.suggested_code.filter(|s| !s.is_empty());
    Issue {
        id: format!("{hash}-{stamp}"),
        hash,
        issue_type: hit.issue_type,
        severity: hit.severity,
        category: rule.category(),
        file: file.to_string(),
        line,
        column: hit.column,
        message: hit.message,
        rule: Some(rule.id().to_string()),
        suggestion: hit.suggestion,
        fixable: suggested_code.is_some(),
        original_code: raw.trim().to_string(),
        suggested_code,
    }
}
