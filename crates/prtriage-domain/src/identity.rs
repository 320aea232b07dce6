//! Stable identity for findings and file contents.

use std::collections::HashSet;

use prtriage_types::Issue;
use sha2::{Digest, Sha256};

/// Stable hash of a finding.
///
/// SHA-256 of `file:line:rule:message`, truncated to 16 hex characters
/// (8 bytes). The display id and column do not participate.
pub fn issue_hash(file: &str, line: u32, rule: &str, message: &str) -> String {
    let input = format!("{file}:{line}:{rule}:{message}");
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..8])
}

/// Full SHA-256 hex digest of a file's content.
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Keeps the first issue per `(file, line, rule-or-type)`, in input order.
pub fn dedupe(issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|i| seen.insert((i.file.clone(), i.line, i.rule_or_type().to_string())))
        .collect()
}
