//! Data types (issues, analysis results, review results, config) for prtriage.
//!
//! This crate is intentionally "dumb": pure DTOs with serde + schemars.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ── Frozen Vocabulary ──────────────────────────────────────────
pub const TOOL_NAME: &str = "prtriage";

/// Hidden marker embedded in every tracking issue body this tool opens.
pub const TRACKING_ISSUE_MARKER: &str = "<!-- prtriage:tracking-issue -->";
/// Title prefix of every tracking issue this tool opens.
pub const TRACKING_ISSUE_TITLE_PREFIX: &str = "[prtriage]";
/// Hidden marker embedded in posted review bodies.
pub const REVIEW_MARKER: &str = "<!-- prtriage:review -->";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Error,
    Warning,
    Info,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Error => "error",
            IssueType::Warning => "warning",
            IssueType::Info => "info",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Whether findings of this severity survive the reporting filter.
    ///
    /// Low-severity findings are computed but never surfaced or counted.
    pub fn is_reportable(self) -> bool {
        matches!(self, Severity::High | Severity::Medium)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Security,
    Performance,
    Format,
    Lint,
    BestPractice,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Security => "security",
            Category::Performance => "performance",
            Category::Format => "format",
            Category::Lint => "lint",
            Category::BestPractice => "best-practice",
        }
    }
}

/// A single finding against one line of one file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Issue {
    /// Display identifier: the hash plus a generation timestamp.
    pub id: String,
    /// Stable identity over `(file, line, rule-or-type, message)`.
    pub hash: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    pub category: Category,
    pub file: String,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub fixable: bool,
    /// Trimmed text of the line at analysis time.
    pub original_code: String,
    /// Literal replacement for the whole line; may span several lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_code: Option<String>,
}

impl Issue {
    /// Rule id when present, otherwise the issue type.
    pub fn rule_or_type(&self) -> &str {
        self.rule.as_deref().unwrap_or(self.issue_type.as_str())
    }

    /// High-severity and security findings block approval and auto-merge.
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::High || self.category == Category::Security
    }
}

/// Equality ignores `id`: it only carries a display timestamp.
impl PartialEq for Issue {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.issue_type == other.issue_type
            && self.severity == other.severity
            && self.category == other.category
            && self.file == other.file
            && self.line == other.line
            && self.column == other.column
            && self.message == other.message
            && self.rule == other.rule
            && self.suggestion == other.suggestion
            && self.fixable == other.fixable
            && self.original_code == other.original_code
            && self.suggested_code == other.suggested_code
    }
}

impl Eq for Issue {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Metrics {
    pub complexity: u32,
    pub maintainability: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_score: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConflictSection {
    /// 1-based line of the `<<<<<<<` marker.
    pub start_line: u32,
    /// 1-based line of the `>>>>>>>` marker.
    pub end_line: u32,
    pub ours_label: String,
    pub theirs_label: String,
    pub ours_lines: Vec<String>,
    pub theirs_lines: Vec<String>,
}

impl ConflictSection {
    /// Reconstruct the literal conflict block, markers included, `\n`-separated.
    pub fn to_block(&self) -> String {
        let mut lines = Vec::with_capacity(self.ours_lines.len() + self.theirs_lines.len() + 3);
        lines.push(marker_line("<<<<<<<", &self.ours_label));
        lines.extend(self.ours_lines.iter().cloned());
        lines.push("=======".to_string());
        lines.extend(self.theirs_lines.iter().cloned());
        lines.push(marker_line(">>>>>>>", &self.theirs_label));
        lines.join("\n")
    }
}

fn marker_line(marker: &str, label: &str) -> String {
    if label.is_empty() {
        marker.to_string()
    } else {
        format!("{marker} {label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ConflictInfo {
    pub sections: Vec<ConflictSection>,
    pub auto_resolvable: bool,
    /// A start marker was never closed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unterminated: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct AnalysisResult {
    pub issues: Vec<Issue>,
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<ConflictInfo>,
}

impl AnalysisResult {
    /// Zero issues, zero metrics.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Counts over reported (high/medium) findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct IssueCounts {
    pub high: u32,
    pub medium: u32,
    pub security: u32,
}

impl IssueCounts {
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::High => counts.high = counts.high.saturating_add(1),
                Severity::Medium => counts.medium = counts.medium.saturating_add(1),
                Severity::Low => {}
            }
            if issue.category == Category::Security {
                counts.security = counts.security.saturating_add(1);
            }
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.high.saturating_add(self.medium)
    }

    pub fn has_blocking(&self) -> bool {
        self.high > 0 || self.security > 0
    }
}

// ── Collaboration-service wire shapes ──────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    Approve,
    RequestChanges,
    Comment,
}

impl ReviewEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewEvent::Approve => "APPROVE",
            ReviewEvent::RequestChanges => "REQUEST_CHANGES",
            ReviewEvent::Comment => "COMMENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    Merge,
    #[default]
    Squash,
    Rebase,
}

impl MergeMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
            MergeMethod::Rebase => "rebase",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    /// Login of the author.
    pub author: String,
    pub head_ref: String,
    pub head_sha: String,
    pub base_ref: String,
    pub state: PullRequestState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChangedFile {
    pub filename: String,
    pub status: FileStatus,
    pub additions: u32,
    pub deletions: u32,
    pub changes: u32,
    /// Unified-diff hunks for this file. Absent for binary or oversized diffs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TrackingIssue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// A content update committed through the collaboration service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileUpdate {
    pub path: String,
    pub content: String,
    pub message: String,
    /// Content identifier the update is based on (optimistic concurrency).
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

// ── Review results ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// A consolidated review was posted.
    Posted,
    /// The acting identity authored the PR; findings returned, nothing posted.
    OwnPullRequest,
    /// At least one file carries conflicts that cannot be resolved automatically.
    ConflictAborted,
    /// Periodic whole-file scan of well-known paths.
    Sweep,
}

impl ReviewOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewOutcome::Posted => "posted",
            ReviewOutcome::OwnPullRequest => "own_pull_request",
            ReviewOutcome::ConflictAborted => "conflict_aborted",
            ReviewOutcome::Sweep => "sweep",
        }
    }
}

/// Per-file change summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileReview {
    pub file: String,
    pub language: String,
    pub additions: u32,
    pub deletions: u32,
    /// Number of new-revision lines the diff marks as added.
    pub changed_lines: u32,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileConflict {
    pub file: String,
    pub sections: Vec<ConflictSection>,
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct FileFixReport {
    pub file: String,
    pub applied: u32,
    pub skipped: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct FixReport {
    pub applied: u32,
    pub skipped: u32,
    pub files: Vec<FileFixReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewResult {
    pub outcome: ReviewOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<ReviewEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequest>,
    pub issues: Vec<Issue>,
    pub counts: IssueCounts,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileReview>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<FileConflict>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolved_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixes: Option<FixReport>,
    #[serde(default)]
    pub merged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_issue: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub closed_tracking_issues: Vec<u64>,
    /// Rendered markdown summary.
    pub summary: String,
}

impl ReviewResult {
    pub fn new(outcome: ReviewOutcome) -> Self {
        Self {
            outcome,
            event: None,
            pull_request: None,
            issues: vec![],
            counts: IssueCounts::default(),
            files: vec![],
            conflicts: vec![],
            resolved_files: vec![],
            fixes: None,
            merged: false,
            tracking_issue: None,
            closed_tracking_issues: vec![],
            summary: String::new(),
        }
    }
}

// ── Configuration ──────────────────────────────────────────────

/// The on-disk configuration file (`prtriage.toml`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub analysis: AnalysisConfig,
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Column budget for the overlong-line rule.
    pub max_line_length: u32,
    /// Files larger than this are not analyzed.
    pub max_file_bytes: u64,
    /// Minimum literal length (in chars) before suggesting a named constant.
    pub min_constant_string_len: u32,
    /// Rule ids to skip.
    pub disabled_rules: Vec<String>,
    /// Path globs never analyzed.
    pub exclude_paths: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_line_length: 120,
            max_file_bytes: 1024 * 1024,
            min_constant_string_len: 30,
            disabled_rules: vec![],
            exclude_paths: vec![
                "**/node_modules/**".to_string(),
                "**/*.min.js".to_string(),
                "**/dist/**".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReviewConfig {
    /// Merge automatically when no blocking finding survives.
    pub auto_merge: bool,
    /// Commit suggested fixes back to the head branch.
    pub auto_fix: bool,
    pub merge_method: MergeMethod,
    /// Well-known files scanned by the periodic sweep.
    pub sweep_paths: Vec<String>,
    /// Ref the sweep reads from.
    pub sweep_ref: String,
    /// Labels applied to tracking issues.
    pub tracking_labels: Vec<String>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            auto_merge: false,
            auto_fix: false,
            merge_method: MergeMethod::Squash,
            sweep_paths: vec![
                "src/index.js".to_string(),
                "src/app.js".to_string(),
                "src/server.js".to_string(),
                "index.js".to_string(),
                "app.js".to_string(),
            ],
            sweep_ref: "main".to_string(),
            tracking_labels: vec![TOOL_NAME.to_string()],
        }
    }
}
