//! Markdown for review bodies, conflict reports and tracking issues.

use prtriage_types::{
    AnalysisResult, Category, FileConflict, FileReview, Issue, IssueCounts, PullRequest,
    REVIEW_MARKER, ReviewEvent, Severity, TOOL_NAME, TRACKING_ISSUE_MARKER,
    TRACKING_ISSUE_TITLE_PREFIX,
};

/// Reporting buckets, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueGroup {
    Security,
    HighSeverity,
    Format,
    Lint,
    Other,
}

impl IssueGroup {
    pub const ALL: [IssueGroup; 5] = [
        IssueGroup::Security,
        IssueGroup::HighSeverity,
        IssueGroup::Format,
        IssueGroup::Lint,
        IssueGroup::Other,
    ];

    /// Security wins over severity; high severity wins over category.
    pub fn of(issue: &Issue) -> Self {
        match (issue.category, issue.severity) {
            (Category::Security, _) => IssueGroup::Security,
            (_, Severity::High) => IssueGroup::HighSeverity,
            (Category::Format, _) => IssueGroup::Format,
            (Category::Lint, _) => IssueGroup::Lint,
            _ => IssueGroup::Other,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            IssueGroup::Security => "Security",
            IssueGroup::HighSeverity => "High severity",
            IssueGroup::Format => "Formatting",
            IssueGroup::Lint => "Lint",
            IssueGroup::Other => "Other",
        }
    }
}

/// Issues split into their [`IssueGroup`]s; empty groups are dropped.
pub fn group_issues<'a>(
    issues: impl IntoIterator<Item = &'a Issue>,
) -> Vec<(IssueGroup, Vec<&'a Issue>)> {
    let mut buckets: Vec<(IssueGroup, Vec<&Issue>)> =
        IssueGroup::ALL.iter().map(|g| (*g, Vec::new())).collect();
    for issue in issues {
        let group = IssueGroup::of(issue);
        if let Some((_, bucket)) = buckets.iter_mut().find(|(g, _)| *g == group) {
            bucket.push(issue);
        }
    }
    buckets.retain(|(_, b)| !b.is_empty());
    buckets
}

/// REQUEST_CHANGES on any blocking finding, APPROVE on none, COMMENT otherwise.
pub fn verdict(counts: &IssueCounts) -> ReviewEvent {
    if counts.has_blocking() {
        ReviewEvent::RequestChanges
    } else if counts.total() == 0 {
        ReviewEvent::Approve
    } else {
        ReviewEvent::Comment
    }
}

fn verdict_label(event: ReviewEvent) -> &'static str {
    match event {
        ReviewEvent::Approve => "approved",
        ReviewEvent::RequestChanges => "changes requested",
        ReviewEvent::Comment => "comments",
    }
}

/// The consolidated review body.
///
/// `posted` is false when the review is only reported back (own pull request).
pub fn render_review(
    pr: &PullRequest,
    files: &[FileReview],
    counts: &IssueCounts,
    resolved_files: &[String],
    posted: bool,
) -> String {
    let event = verdict(counts);
    let mut out = String::new();
    out.push_str(REVIEW_MARKER);
    out.push('\n');
    out.push_str(&format!("## {TOOL_NAME}: {}\n\n", verdict_label(event)));

    if !posted {
        out.push_str(
            "_Review not posted: this pull request was opened by the reviewing identity._\n\n",
        );
    }

    let lines: u32 = files.iter().map(|f| f.changed_lines).sum();
    out.push_str(&format!(
        "Reviewed **{}** file(s), **{}** changed line(s) in #{} (`{}` → `{}`)\n\n",
        files.len(),
        lines,
        pr.number,
        escape_md(&pr.head_ref),
        escape_md(&pr.base_ref),
    ));

    if !resolved_files.is_empty() {
        out.push_str("**Merge conflicts resolved automatically:**\n");
        for f in resolved_files {
            out.push_str(&format!("- `{}`\n", escape_md(f)));
        }
        out.push('\n');
    }

    let issues: Vec<&Issue> = files.iter().flat_map(|f| &f.issues).collect();
    if issues.is_empty() {
        out.push_str("No findings.\n");
        return out;
    }

    out.push_str(&format!(
        "**{}** finding(s): {} high, {} medium, {} security\n\n",
        counts.total(),
        counts.high,
        counts.medium,
        counts.security
    ));
    push_issue_groups(&mut out, issues);
    out
}

fn push_issue_groups<'a>(out: &mut String, issues: impl IntoIterator<Item = &'a Issue>) {
    for (group, members) in group_issues(issues) {
        out.push_str(&format!("### {} ({})\n\n", group.title(), members.len()));
        out.push_str("| Severity | Rule | Location | Message | Suggestion |\n");
        out.push_str("|---|---|---|---|---|\n");
        for issue in members {
            out.push_str(&render_issue_row(issue));
        }
        out.push('\n');
    }
}

fn render_issue_row(issue: &Issue) -> String {
    let loc = format!("{}:{}", escape_md(&issue.file), issue.line);
    let suggestion = issue.suggestion.as_deref().map(escape_md).unwrap_or_default();
    format!(
        "| {sev} | `{rule}` | `{loc}` | {msg} | {suggestion} |\n",
        sev = issue.severity.as_str(),
        rule = escape_md(issue.rule_or_type()),
        msg = escape_md(&issue.message),
    )
}

/// Diagnostics for a review aborted on conflicts nobody can merge blindly.
pub fn render_conflict_report(pr: &PullRequest, conflicts: &[FileConflict]) -> String {
    let mut out = String::new();
    out.push_str(REVIEW_MARKER);
    out.push('\n');
    out.push_str(&format!("## {TOOL_NAME}: merge conflicts need attention\n\n"));
    out.push_str(&format!(
        "#{} cannot be reviewed until these conflicts are resolved by hand.\n\n",
        pr.number
    ));

    for c in conflicts {
        let state = if c.resolved { "resolved" } else { "unresolved" };
        out.push_str(&format!("- `{}` ({state})", escape_md(&c.file)));
        if let Some(reason) = &c.reason {
            out.push_str(&format!(": {}", escape_md(reason)));
        }
        out.push('\n');
        if c.resolved {
            continue;
        }
        for s in &c.sections {
            out.push_str(&format!(
                "  - lines {}-{}: `{}` vs `{}`\n",
                s.start_line,
                s.end_line,
                escape_md(&s.ours_label),
                escape_md(&s.theirs_label)
            ));
        }
    }
    out
}

pub fn tracking_issue_title(count: u32, sweep_ref: &str) -> String {
    format!("{TRACKING_ISSUE_TITLE_PREFIX} {count} open finding(s) on {sweep_ref}")
}

pub fn render_tracking_issue(sweep_ref: &str, files: &[FileReview]) -> String {
    let mut out = String::new();
    out.push_str(TRACKING_ISSUE_MARKER);
    out.push('\n');
    out.push_str(&format!(
        "## {TOOL_NAME}: findings on `{}`\n\n",
        escape_md(sweep_ref)
    ));
    out.push_str("| File | Language | Findings |\n|---|---|---|\n");
    for f in files {
        out.push_str(&format!(
            "| `{}` | {} | {} |\n",
            escape_md(&f.file),
            f.language,
            f.issues.len()
        ));
    }
    out.push('\n');
    push_issue_groups(&mut out, files.iter().flat_map(|f| &f.issues));
    out.push_str("This issue is updated on every sweep and closed once the findings are gone.\n");
    out
}

pub fn render_tracking_closed(sweep_ref: &str) -> String {
    format!(
        "The latest sweep of `{}` found nothing to report. Closing.",
        escape_md(sweep_ref)
    )
}

/// Stand-alone report for one analyzed file (CLI output).
pub fn render_analysis(file: &str, result: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("## {TOOL_NAME}: `{}`\n\n", escape_md(file)));

    let m = &result.metrics;
    out.push_str(&format!(
        "Complexity **{}**, maintainability **{}**",
        m.complexity, m.maintainability
    ));
    if let Some(score) = m.performance_score {
        out.push_str(&format!(", performance **{score}**"));
    }
    out.push_str("\n\n");

    if let Some(info) = &result.conflicts {
        out.push_str(&format!(
            "**Merge conflicts:** {} section(s), {}\n\n",
            info.sections.len(),
            if info.auto_resolvable {
                "auto-resolvable"
            } else {
                "manual resolution required"
            }
        ));
    }

    if result.issues.is_empty() {
        out.push_str("No findings.\n");
    } else {
        push_issue_groups(&mut out, &result.issues);
    }

    if !result.suggestions.is_empty() {
        out.push_str("**Suggestions:**\n");
        for s in &result.suggestions {
            out.push_str(&format!("- {s}\n"));
        }
    }
    out
}

fn escape_md(s: &str) -> String {
    s.replace('|', "\\|").replace('`', "\\`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use prtriage_testkit::fixtures::{issue, sample_pull_requests};
    use prtriage_types::{ConflictSection, Metrics};

    fn review(file: &str, issues: Vec<Issue>) -> FileReview {
        FileReview {
            file: file.to_string(),
            language: "javascript".to_string(),
            additions: 3,
            deletions: 0,
            changed_lines: 3,
            issues,
        }
    }

    #[test]
    fn groups_follow_display_order() {
        let issues = vec![
            issue(Category::Lint, Severity::Medium),
            issue(Category::Performance, Severity::High),
            issue(Category::Security, Severity::High),
            issue(Category::Format, Severity::Medium),
            issue(Category::BestPractice, Severity::Medium),
        ];
        let groups: Vec<_> = group_issues(&issues).into_iter().map(|(g, _)| g).collect();
        assert_eq!(groups, IssueGroup::ALL.to_vec());
    }

    #[test]
    fn security_outranks_high_severity() {
        assert_eq!(
            IssueGroup::of(&issue(Category::Security, Severity::Medium)),
            IssueGroup::Security
        );
        assert_eq!(
            IssueGroup::of(&issue(Category::Format, Severity::High)),
            IssueGroup::HighSeverity
        );
    }

    #[test]
    fn verdicts() {
        assert_eq!(verdict(&IssueCounts::default()), ReviewEvent::Approve);
        let medium = IssueCounts {
            medium: 2,
            ..IssueCounts::default()
        };
        assert_eq!(verdict(&medium), ReviewEvent::Comment);
        let security = IssueCounts {
            medium: 1,
            security: 1,
            ..IssueCounts::default()
        };
        assert_eq!(verdict(&security), ReviewEvent::RequestChanges);
    }

    #[test]
    fn review_body_carries_marker_and_groups() {
        let pr = sample_pull_requests::open(7, "octo");
        let files = vec![review(
            "src/app.js",
            vec![
                issue(Category::Security, Severity::High),
                issue(Category::Lint, Severity::Medium),
            ],
        )];
        let counts = IssueCounts::from_issues(&files[0].issues);
        let md = render_review(&pr, &files, &counts, &[], true);
        assert!(md.starts_with(REVIEW_MARKER));
        assert!(md.contains("changes requested"));
        assert!(md.contains("### Security (1)"));
        assert!(md.contains("### Lint (1)"));
        assert!(!md.contains("Review not posted"));
    }

    #[test]
    fn own_pull_request_body_says_so() {
        let pr = sample_pull_requests::open(7, "octo");
        let md = render_review(&pr, &[], &IssueCounts::default(), &[], false);
        assert!(md.contains("Review not posted"));
        assert!(md.contains("No findings."));
    }

    #[test]
    fn issue_row_escapes_pipes_and_backticks() {
        let mut i = issue(Category::Lint, Severity::Medium);
        i.file = "src/a|b.js".to_string();
        i.line = 4;
        i.rule = Some("eqeqeq".to_string());
        i.message = "use `===` | not `==`".to_string();
        i.suggestion = Some("strict".to_string());
        insta::assert_snapshot!(
            render_issue_row(&i).trim_end(),
            @"| medium | `eqeqeq` | `src/a\\|b.js:4` | use \\`===\\` \\| not \\`==\\` | strict |"
        );
    }

    #[test]
    fn conflict_report_lists_unresolved_sections() {
        let pr = sample_pull_requests::open(3, "octo");
        let conflicts = vec![FileConflict {
            file: "src/app.js".to_string(),
            sections: vec![ConflictSection {
                start_line: 2,
                end_line: 6,
                ours_label: "HEAD".to_string(),
                theirs_label: "feature".to_string(),
                ours_lines: vec!["a".to_string()],
                theirs_lines: vec!["b".to_string()],
            }],
            resolved: false,
            reason: Some("1 conflict section(s) cannot be resolved automatically".to_string()),
        }];
        let md = render_conflict_report(&pr, &conflicts);
        assert!(md.contains("`src/app.js` (unresolved)"));
        assert!(md.contains("lines 2-6: `HEAD` vs `feature`"));
    }

    #[test]
    fn tracking_issue_has_marker_and_prefix() {
        let files = vec![review(
            "src/index.js",
            vec![issue(Category::Security, Severity::High)],
        )];
        let body = render_tracking_issue("main", &files);
        assert!(body.starts_with(TRACKING_ISSUE_MARKER));
        assert!(body.contains("| `src/index.js` | javascript | 1 |"));
        assert!(tracking_issue_title(1, "main").starts_with(TRACKING_ISSUE_TITLE_PREFIX));
    }

    #[test]
    fn analysis_report_shows_metrics() {
        let result = AnalysisResult {
            metrics: Metrics {
                complexity: 3,
                maintainability: 90,
                performance_score: Some(100),
            },
            suggestions: vec!["Clean up 1 lint issue(s)".to_string()],
            issues: vec![issue(Category::Lint, Severity::Medium)],
            ..AnalysisResult::empty()
        };
        let md = render_analysis("src/app.js", &result);
        assert!(md.contains("Complexity **3**, maintainability **90**, performance **100**"));
        assert!(md.contains("- Clean up 1 lint issue(s)"));
    }
}
