//! The seam to the code-hosting service.
//!
//! The orchestrator never speaks HTTP. Everything it needs from the outside
//! world goes through [`CollaborationService`], so a real client and an
//! in-memory fake are interchangeable.

use async_trait::async_trait;

use prtriage_types::{
    ChangedFile, FileUpdate, IssueState, MergeMethod, PullRequest, ReviewEvent, TrackingIssue,
};

/// Failure reported by a [`CollaborationService`] call.
///
/// The orchestrator branches on the variant, never on the message text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The service refuses a review from the pull request's own author.
    #[error("cannot review a pull request opened by the acting identity")]
    SelfReviewForbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limited{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("service responded {status}: {message}")]
    Api { status: u16, message: String },
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

/// Operations the review workflow consumes.
///
/// `git_ref` arguments accept a branch name or a commit sha.
#[async_trait]
pub trait CollaborationService: Send + Sync {
    async fn pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, ServiceError>;

    /// Changed files with their per-file patch text.
    async fn changed_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ChangedFile>, ServiceError>;

    /// Decoded text of `path` at `git_ref`.
    async fn file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<String, ServiceError>;

    /// Content identifier of `path` at `git_ref`, required by [`update_file`](Self::update_file).
    async fn file_sha(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<String, ServiceError>;

    async fn update_file(
        &self,
        owner: &str,
        repo: &str,
        update: &FileUpdate,
    ) -> Result<(), ServiceError>;

    /// Login of the identity the service acts as.
    async fn current_user(&self) -> Result<String, ServiceError>;

    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        event: ReviewEvent,
        body: &str,
    ) -> Result<(), ServiceError>;

    async fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        method: MergeMethod,
    ) -> Result<(), ServiceError>;

    async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        state: IssueState,
    ) -> Result<Vec<TrackingIssue>, ServiceError>;

    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<TrackingIssue, ServiceError>;

    async fn update_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        title: &str,
        body: &str,
    ) -> Result<(), ServiceError>;

    async fn close_issue(&self, owner: &str, repo: &str, number: u64)
    -> Result<(), ServiceError>;

    async fn comment_on_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), ServiceError>;
}
