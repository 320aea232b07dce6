//! Pull-request review workflow.
//!
//! A review walks `fetch → conflict check → analyze → post → auto-fix →
//! auto-merge`. The conflict check runs to completion before any analysis:
//! the first file with conflicts that cannot be resolved automatically ends
//! the run with [`ReviewOutcome::ConflictAborted`], and nothing is posted.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use prtriage_diff::parse_changed_lines;
use prtriage_domain::{Analyzer, apply_fixes, dedupe, detect_language, has_conflicts, resolve};
use prtriage_types::{
    ChangedFile, ConfigFile, FileConflict, FileFixReport, FileReview, FileStatus, FileUpdate,
    FixReport, IssueCounts, PullRequest, ReviewOutcome, ReviewResult, TOOL_NAME,
};

use crate::render::{render_conflict_report, render_review, verdict};
use crate::service::{CollaborationService, ServiceError};
use crate::settings::{PathFilterError, ReviewSettings};

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("collaboration service call failed: {0}")]
    Service(#[from] ServiceError),
}

/// Drives reviews and sweeps against one collaboration service.
pub struct ReviewOrchestrator<S> {
    pub(crate) service: S,
    pub(crate) analyzer: Analyzer,
    pub(crate) settings: ReviewSettings,
}

/// Where a review is pointed.
pub(crate) struct Target<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
}

impl<S: CollaborationService> ReviewOrchestrator<S> {
    pub fn new(service: S, config: &ConfigFile) -> Result<Self, PathFilterError> {
        Ok(Self::with_parts(
            service,
            Analyzer::new(config.analysis.clone()),
            ReviewSettings::from_config(config)?,
        ))
    }

    pub fn with_parts(service: S, analyzer: Analyzer, settings: ReviewSettings) -> Self {
        Self {
            service,
            analyzer,
            settings,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn settings(&self) -> &ReviewSettings {
        &self.settings
    }

    pub async fn review_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ReviewResult, ReviewError> {
        let target = Target { owner, repo };

        debug!(owner, repo, number, "fetching pull request");
        let pr = self.service.pull_request(owner, repo, number).await?;
        let files = self.service.changed_files(owner, repo, number).await?;
        let me = self.service.current_user().await?;
        debug!(files = files.len(), author = %pr.author, "fetched pull request");

        let checked = match self.check_conflicts(&target, &pr, &files).await? {
            ConflictCheck::Clear(checked) => checked,
            ConflictCheck::Aborted(result) => return Ok(*result),
        };

        let reviews = self.analyze_files(&files, &checked);
        let issues = dedupe(reviews.iter().flat_map(|f| f.issues.clone()).collect());
        let counts = IssueCounts::from_issues(&issues);
        let event = verdict(&counts);
        debug!(
            issues = issues.len(),
            high = counts.high,
            security = counts.security,
            "aggregated findings"
        );

        let mut result = ReviewResult::new(ReviewOutcome::Posted);
        result.event = Some(event);
        result.issues = issues;
        result.counts = counts;
        result.conflicts = checked.conflicts;
        result.resolved_files = checked.resolved;

        if pr.author == me {
            info!(number, "own pull request, review not posted");
            return Ok(own_pull_request(result, pr, reviews));
        }

        let body = render_review(&pr, &reviews, &result.counts, &result.resolved_files, true);
        match self
            .service
            .create_review(owner, repo, number, event, &body)
            .await
        {
            Ok(()) => {}
            Err(ServiceError::SelfReviewForbidden) => {
                info!(number, "service refused a self-review, reporting instead");
                return Ok(own_pull_request(result, pr, reviews));
            }
            Err(e) => return Err(e.into()),
        }
        info!(number, event = event.as_str(), "review posted");
        result.summary = body;

        if self.settings.review.auto_fix {
            result.fixes = Some(
                self.commit_fixes(&target, &pr, &reviews, &checked.contents)
                    .await?,
            );
        }

        if self.settings.review.auto_merge {
            if result.counts.has_blocking() {
                info!(number, "blocking findings, not merging");
            } else {
                let method = self.settings.review.merge_method;
                self.service
                    .merge_pull_request(owner, repo, number, method)
                    .await?;
                info!(number, method = method.as_str(), "merged");
                result.merged = true;
            }
        }

        result.pull_request = Some(pr);
        result.files = reviews;
        Ok(result)
    }

    /// Fetch every live file, resolving conflicts as we go.
    async fn check_conflicts(
        &self,
        target: &Target<'_>,
        pr: &PullRequest,
        files: &[ChangedFile],
    ) -> Result<ConflictCheck, ReviewError> {
        let mut checked = CheckedFiles::default();

        for file in files {
            if file.status == FileStatus::Removed {
                continue;
            }
            let path = file.filename.as_str();
            let content = match self
                .service
                .file_content(target.owner, target.repo, path, &pr.head_sha)
                .await
            {
                Ok(content) => content,
                Err(e) if e.is_not_found() => {
                    warn!(file = path, "content not found, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if !has_conflicts(&content) {
                checked.contents.insert(path.to_string(), content);
                continue;
            }

            match resolve(&content) {
                Ok(resolved) => {
                    debug!(file = path, "resolving conflicts");
                    let update = FileUpdate {
                        path: path.to_string(),
                        message: format!("{TOOL_NAME}: resolve merge conflicts in {path}"),
                        sha: self
                            .service
                            .file_sha(target.owner, target.repo, path, &pr.head_ref)
                            .await?,
                        content: resolved.clone(),
                        branch: Some(pr.head_ref.clone()),
                    };
                    self.service
                        .update_file(target.owner, target.repo, &update)
                        .await?;
                    info!(file = path, "conflicts resolved");
                    checked.conflicts.push(FileConflict {
                        file: path.to_string(),
                        sections: prtriage_domain::extract_sections(&content),
                        resolved: true,
                        reason: None,
                    });
                    checked.resolved.push(path.to_string());
                    checked.contents.insert(path.to_string(), resolved);
                }
                Err(unresolved) => {
                    warn!(file = path, error = %unresolved, "aborting on unresolved conflicts");
                    checked.conflicts.push(FileConflict {
                        file: path.to_string(),
                        reason: Some(unresolved.to_string()),
                        sections: unresolved.sections,
                        resolved: false,
                    });
                    let mut result = ReviewResult::new(ReviewOutcome::ConflictAborted);
                    result.summary = render_conflict_report(pr, &checked.conflicts);
                    result.conflicts = checked.conflicts;
                    result.resolved_files = checked.resolved;
                    result.pull_request = Some(pr.clone());
                    return Ok(ConflictCheck::Aborted(Box::new(result)));
                }
            }
        }

        Ok(ConflictCheck::Clear(checked))
    }

    /// Files whose conflicts were resolved are analyzed whole: their patch
    /// numbers lines of the pre-resolution text.
    fn analyze_files(&self, files: &[ChangedFile], checked: &CheckedFiles) -> Vec<FileReview> {
        let mut reviews = Vec::new();
        for file in files {
            let path = file.filename.as_str();
            let Some(content) = checked.contents.get(path) else {
                continue;
            };
            if self.settings.is_excluded(path) {
                debug!(file = path, "excluded");
                continue;
            }
            let changed = file
                .patch
                .as_deref()
                .map(parse_changed_lines)
                .unwrap_or_default();
            if changed.is_empty() {
                debug!(file = path, "no added lines");
                continue;
            }

            let analysis = if checked.resolved.iter().any(|r| r == path) {
                self.analyzer.analyze(content, path, "")
            } else {
                self.analyzer
                    .analyze_changed_lines(content, path, "", &changed)
            };
            reviews.push(FileReview {
                file: path.to_string(),
                language: detect_language(path).as_str().to_string(),
                additions: file.additions,
                deletions: file.deletions,
                changed_lines: u32::try_from(changed.len()).unwrap_or(u32::MAX),
                issues: analysis.issues,
            });
        }
        reviews
    }

    async fn commit_fixes(
        &self,
        target: &Target<'_>,
        pr: &PullRequest,
        reviews: &[FileReview],
        contents: &BTreeMap<String, String>,
    ) -> Result<FixReport, ReviewError> {
        let mut report = FixReport::default();
        for review in reviews {
            if !review.issues.iter().any(|i| i.fixable) {
                continue;
            }
            let Some(content) = contents.get(&review.file) else {
                continue;
            };
            let outcome = apply_fixes(content, &review.issues);
            if outcome.applied > 0 {
                let path = review.file.as_str();
                let update = FileUpdate {
                    path: path.to_string(),
                    message: format!(
                        "{TOOL_NAME}: apply {} suggested fix(es) to {path}",
                        outcome.applied
                    ),
                    sha: self
                        .service
                        .file_sha(target.owner, target.repo, path, &pr.head_ref)
                        .await?,
                    content: outcome.content,
                    branch: Some(pr.head_ref.clone()),
                };
                self.service
                    .update_file(target.owner, target.repo, &update)
                    .await?;
                info!(file = path, applied = outcome.applied, "fixes committed");
            }
            report.applied += outcome.applied;
            report.skipped += outcome.skipped;
            report.files.push(FileFixReport {
                file: review.file.clone(),
                applied: outcome.applied,
                skipped: outcome.skipped,
            });
        }
        Ok(report)
    }
}

#[derive(Default)]
struct CheckedFiles {
    /// Path → content to analyze (post-resolution when conflicts were resolved).
    contents: BTreeMap<String, String>,
    conflicts: Vec<FileConflict>,
    resolved: Vec<String>,
}

enum ConflictCheck {
    Clear(CheckedFiles),
    Aborted(Box<ReviewResult>),
}

fn own_pull_request(
    mut result: ReviewResult,
    pr: PullRequest,
    reviews: Vec<FileReview>,
) -> ReviewResult {
    result.outcome = ReviewOutcome::OwnPullRequest;
    result.summary = render_review(&pr, &reviews, &result.counts, &result.resolved_files, false);
    result.pull_request = Some(pr);
    result.files = reviews;
    result
}

