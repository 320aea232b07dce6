//! Domain logic: rule evaluation, finding identity, conflict resolution and fixes.
//!
//! This crate is I/O-free. Every entry point takes text and returns values, so
//! the orchestrator and the CLI share one implementation.

pub mod analyzer;
pub mod cache;
pub mod conflict;
pub mod engine;
pub mod fixes;
pub mod identity;
pub mod metrics;
pub mod preprocess;
pub mod rules;
pub mod source;

pub use analyzer::Analyzer;
pub use cache::IssueCache;
pub use conflict::{
    ScanState, UnresolvedConflicts, conflict_info, extract_sections, has_conflicts,
    is_auto_resolvable, merge_section, resolve, resolve_with_fallback,
};
pub use engine::{AnalysisError, analyze_source, detect_language};
pub use fixes::{FixOutcome, apply_fixes};
pub use identity::{content_hash, dedupe, issue_hash};
pub use preprocess::{Language, PreprocessOptions, Preprocessor};
pub use rules::{LineContext, Rule, RuleHit, builtin_rules, rule_catalog};
pub use source::{SourceFile, SourceLine};
