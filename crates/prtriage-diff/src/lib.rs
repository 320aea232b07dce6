//! Unified diff parsing.
//!
//! This crate turns unified-diff patch text into the set of line numbers in the
//! new revision that the patch adds.

mod unified;

pub use unified::{DiffParseError, FileDiff, parse_changed_lines, parse_unified_diff};
