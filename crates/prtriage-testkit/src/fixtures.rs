//! Common test fixtures for prtriage.
//!
//! Sample configs, sources with known findings, patches and pull requests for
//! use in tests across the workspace.

use prtriage_types::{
    AnalysisConfig, Category, ChangedFile, ConfigFile, FileStatus, Issue, IssueType,
    PullRequest, PullRequestState, ReviewConfig, Severity,
};

/// A bare finding with no fix, for metric and filter tests.
pub fn issue(category: Category, severity: Severity) -> Issue {
    Issue {
        id: "0000000000000000-0".to_string(),
        hash: "0000000000000000".to_string(),
        issue_type: IssueType::Warning,
        severity,
        category,
        file: "src/app.js".to_string(),
        line: 1,
        column: None,
        message: "fixture finding".to_string(),
        rule: None,
        suggestion: None,
        fixable: false,
        original_code: String::new(),
        suggested_code: None,
    }
}

// =============================================================================
// Sample Configs
// =============================================================================

pub mod sample_configs {
    use super::*;

    pub fn empty() -> ConfigFile {
        ConfigFile::default()
    }

    /// Auto-fix and auto-merge both switched on.
    pub fn hands_off() -> ConfigFile {
        ConfigFile {
            analysis: AnalysisConfig::default(),
            review: ReviewConfig {
                auto_merge: true,
                auto_fix: true,
                ..ReviewConfig::default()
            },
        }
    }

    /// Format rules off and a tighter line budget.
    pub fn strict_lines() -> ConfigFile {
        ConfigFile {
            analysis: AnalysisConfig {
                max_line_length: 80,
                disabled_rules: vec!["semi".to_string(), "quotes".to_string()],
                ..AnalysisConfig::default()
            },
            review: ReviewConfig::default(),
        }
    }

    pub const TOML_PARTIAL: &str = r#"
[analysis]
max_line_length = 100
disabled_rules = ["no-console"]

[review]
auto_merge = true
merge_method = "rebase"
"#;
}

// =============================================================================
// Sample Sources
// =============================================================================

pub mod sample_sources {
    /// No reportable findings.
    pub const CLEAN_JS: &str = "\
/**
 * Adds two numbers.
 */
export function add(a, b) {
  return a + b;
}
";

    /// One loose equality on line 2 and one `eval` on line 3.
    pub const EQ_AND_EVAL_JS: &str = "\
export function check(a, b) {
  if (a == b) {
    return eval(a);
  }
  return null;
}
";

    /// An allocation inside a loop body on line 3.
    pub const ALLOC_IN_LOOP_JS: &str = "\
export function rows(items) {
  for (const item of items) {
    const row = [];
    row.push(item);
  }
}
";

    /// A Python file with a hardcoded credential on line 1.
    pub const SECRET_PY: &str = "API_KEY = \"s3cr3t-v4lue-123\"\nprint(API_KEY)\n";

    /// One auto-resolvable conflict: ours is empty.
    pub const ONE_SIDED_CONFLICT: &str = "\
const a = 1;
<<<<<<< HEAD
=======
const b = 2;
>>>>>>> feature
";

    /// One conflict whose sides genuinely differ.
    pub const HARD_CONFLICT: &str = "\
<<<<<<< HEAD
const limit = 10;
=======
const limit = 20;
>>>>>>> feature
";
}

// =============================================================================
// Sample Patches
// =============================================================================

pub mod sample_patches {
    /// Adds line 2 of [`EQ_AND_EVAL_JS`](super::sample_sources::EQ_AND_EVAL_JS).
    pub const EQ_LINE_ADDED: &str = "\
@@ -1,1 +1,2 @@
 export function check(a, b) {
+  if (a == b) {
";

    /// Adds lines 2 and 3.
    pub const EQ_AND_EVAL_ADDED: &str = "\
@@ -1,1 +1,3 @@
 export function check(a, b) {
+  if (a == b) {
+    return eval(a);
";

    /// A full `git diff` touching two files.
    pub const TWO_FILES: &str = "\
diff --git a/src/a.js b/src/a.js
index 1111111..2222222 100644
--- a/src/a.js
+++ b/src/a.js
@@ -1,2 +1,3 @@
 const a = 1;
+const b = 2;
 const c = 3;
diff --git a/src/b.js b/src/b.js
index 3333333..4444444 100644
--- a/src/b.js
+++ b/src/b.js
@@ -10,2 +10,2 @@
-old();
+neu();
 keep();
";
}

// =============================================================================
// Pull Requests
// =============================================================================

pub mod sample_pull_requests {
    use super::*;

    pub fn open(number: u64, author: &str) -> PullRequest {
        PullRequest {
            number,
            title: format!("Change #{number}"),
            author: author.to_string(),
            head_ref: "feature".to_string(),
            head_sha: "abc123".to_string(),
            base_ref: "main".to_string(),
            state: PullRequestState::Open,
        }
    }

    pub fn changed(filename: &str, patch: &str) -> ChangedFile {
        let additions = patch
            .lines()
            .filter(|l| l.starts_with('+') && !l.starts_with("+++"))
            .count() as u32;
        let deletions = patch
            .lines()
            .filter(|l| l.starts_with('-') && !l.starts_with("---"))
            .count() as u32;
        ChangedFile {
            filename: filename.to_string(),
            status: FileStatus::Modified,
            additions,
            deletions,
            changes: additions + deletions,
            patch: Some(patch.to_string()),
        }
    }

    pub fn removed(filename: &str) -> ChangedFile {
        ChangedFile {
            filename: filename.to_string(),
            status: FileStatus::Removed,
            additions: 0,
            deletions: 3,
            changes: 3,
            patch: None,
        }
    }
}
