//! Periodic whole-file scan of well-known entry points.
//!
//! Findings are tracked in a single open issue. A tracking issue is
//! recognised by its title prefix or by the marker in its body, so issues a
//! maintainer has retitled are still found.

use tracing::{debug, info, warn};

use prtriage_domain::{dedupe, detect_language};
use prtriage_types::{
    FileReview, IssueCounts, IssueState, ReviewOutcome, ReviewResult, TRACKING_ISSUE_MARKER,
    TRACKING_ISSUE_TITLE_PREFIX, TrackingIssue,
};

use crate::render::{render_tracking_closed, render_tracking_issue, tracking_issue_title};
use crate::review::{ReviewError, ReviewOrchestrator};
use crate::service::CollaborationService;

pub fn is_tracking_issue(issue: &TrackingIssue) -> bool {
    issue.title.starts_with(TRACKING_ISSUE_TITLE_PREFIX)
        || issue.body.contains(TRACKING_ISSUE_MARKER)
}

impl<S: CollaborationService> ReviewOrchestrator<S> {
    pub async fn review_repository_sweep(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ReviewResult, ReviewError> {
        let review = &self.settings.review;
        let git_ref = review.sweep_ref.as_str();
        let mut files = Vec::new();

        for path in &review.sweep_paths {
            if self.settings.is_excluded(path) {
                continue;
            }
            let content = match self.service.file_content(owner, repo, path, git_ref).await {
                Ok(content) => content,
                Err(e) if e.is_not_found() => {
                    debug!(file = %path, git_ref, "not present, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let analysis = self.analyzer.analyze(&content, path, "");
            files.push(FileReview {
                file: path.clone(),
                language: detect_language(path).as_str().to_string(),
                additions: 0,
                deletions: 0,
                changed_lines: u32::try_from(content.lines().count()).unwrap_or(u32::MAX),
                issues: analysis.issues,
            });
        }

        let issues = dedupe(files.iter().flat_map(|f| f.issues.clone()).collect());
        let counts = IssueCounts::from_issues(&issues);
        let mut result = ReviewResult::new(ReviewOutcome::Sweep);

        let open: Vec<TrackingIssue> = self
            .service
            .list_issues(owner, repo, IssueState::Open)
            .await?
            .into_iter()
            .filter(is_tracking_issue)
            .collect();

        if issues.is_empty() {
            let comment = render_tracking_closed(git_ref);
            for tracking in &open {
                self.service
                    .comment_on_issue(owner, repo, tracking.number, &comment)
                    .await?;
                self.service.close_issue(owner, repo, tracking.number).await?;
                info!(issue = tracking.number, "tracking issue closed");
                result.closed_tracking_issues.push(tracking.number);
            }
            result.summary = comment;
        } else {
            let title = tracking_issue_title(counts.total(), git_ref);
            let body = render_tracking_issue(git_ref, &files);
            let number = match open.first() {
                Some(existing) => {
                    if open.len() > 1 {
                        warn!(count = open.len(), "several open tracking issues, updating the first");
                    }
                    self.service
                        .update_issue(owner, repo, existing.number, &title, &body)
                        .await?;
                    info!(issue = existing.number, "tracking issue updated");
                    existing.number
                }
                None => {
                    let created = self
                        .service
                        .create_issue(owner, repo, &title, &body, &review.tracking_labels)
                        .await?;
                    info!(issue = created.number, "tracking issue opened");
                    created.number
                }
            };
            result.tracking_issue = Some(number);
            result.summary = body;
        }

        result.issues = issues;
        result.counts = counts;
        result.files = files;
        Ok(result)
    }
}
