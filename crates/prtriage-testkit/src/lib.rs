//! Shared test utilities for the prtriage workspace.
//!
//! This crate provides:
//! - **arb**: Proptest strategies for issues, patches and conflict blocks
//! - **diff_builder**: Unified diff builders for constructing test patches
//! - **schema**: JSON schema validators for DTOs
//! - **fixtures**: Sample configs, sources, patches and pull requests
//!
//! # Example
//!
//! ```rust,ignore
//! use prtriage_testkit::arb;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     fn issue_has_a_line(issue in arb::arb_issue()) {
//!         assert!(issue.line > 0);
//!     }
//! }
//! ```

pub mod arb;
pub mod diff_builder;
pub mod fixtures;
pub mod schema;

pub use arb::{arb_conflicted_text, arb_file, arb_hunk, arb_issue, arb_severity};
pub use diff_builder::{DiffBuilder, FileBuilder, HunkBuilder};
pub use fixtures::{sample_configs, sample_patches, sample_pull_requests, sample_sources};
pub use schema::{validate_analysis_result, validate_config_file, validate_review_result};
