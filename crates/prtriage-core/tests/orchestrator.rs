//! End-to-end review and sweep runs against an in-memory collaboration service.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use prtriage_core::{CollaborationService, ReviewError, ReviewOrchestrator, ServiceError};
use prtriage_testkit::fixtures::{sample_configs, sample_patches, sample_pull_requests, sample_sources};
use prtriage_types::{
    ChangedFile, ConfigFile, FileUpdate, IssueState, MergeMethod, PullRequest, ReviewEvent,
    ReviewOutcome, TRACKING_ISSUE_MARKER, TrackingIssue,
};

const OWNER: &str = "acme";
const REPO: &str = "shop";
const BOT: &str = "prtriage-bot";

#[derive(Debug, Default)]
struct Calls {
    fetched: Vec<(String, String)>,
    reviews: Vec<(ReviewEvent, String)>,
    updates: Vec<FileUpdate>,
    merges: Vec<MergeMethod>,
    created_issues: Vec<(String, Vec<String>)>,
    updated_issues: Vec<u64>,
    comments: Vec<u64>,
    closed: Vec<u64>,
}

/// Serves one pull request and a flat path → content map.
struct FakeService {
    pr: PullRequest,
    files: Vec<ChangedFile>,
    contents: HashMap<String, String>,
    user: String,
    pr_error: Option<ServiceError>,
    review_error: Option<ServiceError>,
    issues: Vec<TrackingIssue>,
    calls: Mutex<Calls>,
}

impl FakeService {
    fn new(author: &str) -> Self {
        Self {
            pr: sample_pull_requests::open(42, author),
            files: vec![],
            contents: HashMap::new(),
            user: BOT.to_string(),
            pr_error: None,
            review_error: None,
            issues: vec![],
            calls: Mutex::new(Calls::default()),
        }
    }

    fn with_file(mut self, path: &str, content: &str, patch: &str) -> Self {
        self.files.push(sample_pull_requests::changed(path, patch));
        self.contents.insert(path.to_string(), content.to_string());
        self
    }

    fn with_content(mut self, path: &str, content: &str) -> Self {
        self.contents.insert(path.to_string(), content.to_string());
        self
    }

    fn with_issue(mut self, number: u64, title: &str, body: &str) -> Self {
        self.issues.push(TrackingIssue {
            number,
            title: title.to_string(),
            body: body.to_string(),
            state: IssueState::Open,
            labels: vec![],
        });
        self
    }

    fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CollaborationService for FakeService {
    async fn pull_request(&self, _: &str, _: &str, _: u64) -> Result<PullRequest, ServiceError> {
        match &self.pr_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.pr.clone()),
        }
    }

    async fn changed_files(&self, _: &str, _: &str, _: u64) -> Result<Vec<ChangedFile>, ServiceError> {
        Ok(self.files.clone())
    }

    async fn file_content(
        &self,
        _: &str,
        _: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<String, ServiceError> {
        self.calls()
            .fetched
            .push((path.to_string(), git_ref.to_string()));
        self.contents
            .get(path)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(path.to_string()))
    }

    async fn file_sha(&self, _: &str, _: &str, path: &str, _: &str) -> Result<String, ServiceError> {
        Ok(format!("sha-{path}"))
    }

    async fn update_file(&self, _: &str, _: &str, update: &FileUpdate) -> Result<(), ServiceError> {
        self.calls().updates.push(update.clone());
        Ok(())
    }

    async fn current_user(&self) -> Result<String, ServiceError> {
        Ok(self.user.clone())
    }

    async fn create_review(
        &self,
        _: &str,
        _: &str,
        _: u64,
        event: ReviewEvent,
        body: &str,
    ) -> Result<(), ServiceError> {
        if let Some(e) = &self.review_error {
            return Err(e.clone());
        }
        self.calls().reviews.push((event, body.to_string()));
        Ok(())
    }

    async fn merge_pull_request(
        &self,
        _: &str,
        _: &str,
        _: u64,
        method: MergeMethod,
    ) -> Result<(), ServiceError> {
        self.calls().merges.push(method);
        Ok(())
    }

    async fn list_issues(&self, _: &str, _: &str, state: IssueState) -> Result<Vec<TrackingIssue>, ServiceError> {
        Ok(self.issues.iter().filter(|i| i.state == state).cloned().collect())
    }

    async fn create_issue(
        &self,
        _: &str,
        _: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<TrackingIssue, ServiceError> {
        self.calls()
            .created_issues
            .push((title.to_string(), labels.to_vec()));
        Ok(TrackingIssue {
            number: 900,
            title: title.to_string(),
            body: body.to_string(),
            state: IssueState::Open,
            labels: labels.to_vec(),
        })
    }

    async fn update_issue(&self, _: &str, _: &str, number: u64, _: &str, _: &str) -> Result<(), ServiceError> {
        self.calls().updated_issues.push(number);
        Ok(())
    }

    async fn close_issue(&self, _: &str, _: &str, number: u64) -> Result<(), ServiceError> {
        self.calls().closed.push(number);
        Ok(())
    }

    async fn comment_on_issue(&self, _: &str, _: &str, number: u64, _: &str) -> Result<(), ServiceError> {
        self.calls().comments.push(number);
        Ok(())
    }
}

/// A patch that adds every line of `content`.
fn all_added(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut patch = format!("@@ -0,0 +1,{} @@\n", lines.len());
    for line in lines {
        patch.push_str(&format!("+{line}\n"));
    }
    patch
}

fn orchestrator(service: FakeService, config: &ConfigFile) -> ReviewOrchestrator<FakeService> {
    ReviewOrchestrator::new(service, config).unwrap()
}

// ── Reviews ────────────────────────────────────────────────────

#[tokio::test]
async fn clean_foreign_pull_request_is_approved() {
    let service = FakeService::new("alice").with_file(
        "src/add.js",
        sample_sources::CLEAN_JS,
        &all_added(sample_sources::CLEAN_JS),
    );
    let o = orchestrator(service, &sample_configs::empty());

    let result = o.review_pull_request(OWNER, REPO, 42).await.unwrap();

    assert_eq!(result.outcome, ReviewOutcome::Posted);
    assert_eq!(result.event, Some(ReviewEvent::Approve));
    assert!(result.issues.is_empty());
    let calls = o.service().calls();
    assert_eq!(calls.reviews.len(), 1);
    assert_eq!(calls.reviews[0].0, ReviewEvent::Approve);
    assert_eq!(calls.fetched, vec![("src/add.js".to_string(), "abc123".to_string())]);
}

#[tokio::test]
async fn medium_findings_comment_and_merge() {
    let service = FakeService::new("alice").with_file(
        "src/check.js",
        sample_sources::EQ_AND_EVAL_JS,
        sample_patches::EQ_LINE_ADDED,
    );
    let o = orchestrator(service, &sample_configs::hands_off());

    let result = o.review_pull_request(OWNER, REPO, 42).await.unwrap();

    assert_eq!(result.event, Some(ReviewEvent::Comment));
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].rule.as_deref(), Some("eqeqeq"));
    assert_eq!(result.issues[0].line, 2);
    assert!(result.merged);
    assert_eq!(o.service().calls().merges, vec![MergeMethod::Squash]);
}

#[tokio::test]
async fn auto_fix_commits_strict_equality() {
    let service = FakeService::new("alice").with_file(
        "src/check.js",
        sample_sources::EQ_AND_EVAL_JS,
        sample_patches::EQ_LINE_ADDED,
    );
    let o = orchestrator(service, &sample_configs::hands_off());

    let result = o.review_pull_request(OWNER, REPO, 42).await.unwrap();

    let fixes = result.fixes.unwrap();
    assert_eq!((fixes.applied, fixes.skipped), (1, 0));
    let calls = o.service().calls();
    assert_eq!(calls.updates.len(), 1);
    let update = &calls.updates[0];
    assert_eq!(update.path, "src/check.js");
    assert_eq!(update.sha, "sha-src/check.js");
    assert_eq!(update.branch.as_deref(), Some("feature"));
    assert_eq!(update.content.lines().nth(1), Some("  if (a === b) {"));
    assert_eq!(update.content.lines().nth(2), Some("    return eval(a);"));
}

#[tokio::test]
async fn security_finding_requests_changes_and_blocks_merge() {
    let service = FakeService::new("alice").with_file(
        "src/check.js",
        sample_sources::EQ_AND_EVAL_JS,
        sample_patches::EQ_AND_EVAL_ADDED,
    );
    let o = orchestrator(service, &sample_configs::hands_off());

    let result = o.review_pull_request(OWNER, REPO, 42).await.unwrap();

    assert_eq!(result.event, Some(ReviewEvent::RequestChanges));
    assert_eq!(result.counts.security, 1);
    assert!(!result.merged);
    assert!(o.service().calls().merges.is_empty());
    assert!(result.summary.contains("### Security (1)"));
}

#[tokio::test]
async fn own_pull_request_is_reported_not_posted() {
    let service = FakeService::new(BOT).with_file(
        "src/check.js",
        sample_sources::EQ_AND_EVAL_JS,
        sample_patches::EQ_AND_EVAL_ADDED,
    );
    let o = orchestrator(service, &sample_configs::hands_off());

    let result = o.review_pull_request(OWNER, REPO, 42).await.unwrap();

    assert_eq!(result.outcome, ReviewOutcome::OwnPullRequest);
    assert_eq!(result.issues.len(), 2);
    assert!(result.summary.contains("Review not posted"));
    let calls = o.service().calls();
    assert!(calls.reviews.is_empty());
    assert!(calls.merges.is_empty());
    assert!(calls.updates.is_empty());
}

#[tokio::test]
async fn self_review_refusal_falls_back_to_report() {
    let mut service = FakeService::new("alice").with_file(
        "src/add.js",
        sample_sources::CLEAN_JS,
        &all_added(sample_sources::CLEAN_JS),
    );
    service.review_error = Some(ServiceError::SelfReviewForbidden);
    let o = orchestrator(service, &sample_configs::hands_off());

    let result = o.review_pull_request(OWNER, REPO, 42).await.unwrap();

    assert_eq!(result.outcome, ReviewOutcome::OwnPullRequest);
    assert!(!result.merged);
    assert!(o.service().calls().merges.is_empty());
}

#[tokio::test]
async fn other_review_errors_are_terminal() {
    let mut service = FakeService::new("alice").with_file(
        "src/add.js",
        sample_sources::CLEAN_JS,
        &all_added(sample_sources::CLEAN_JS),
    );
    service.review_error = Some(ServiceError::Api {
        status: 422,
        message: "Unprocessable".to_string(),
    });
    let o = orchestrator(service, &sample_configs::empty());

    let err = o.review_pull_request(OWNER, REPO, 42).await.unwrap_err();
    assert!(matches!(err, ReviewError::Service(ServiceError::Api { status: 422, .. })));
}

#[tokio::test]
async fn fetch_failure_is_terminal() {
    let mut service = FakeService::new("alice");
    service.pr_error = Some(ServiceError::Transport("connection reset".to_string()));
    let o = orchestrator(service, &sample_configs::empty());

    let err = o.review_pull_request(OWNER, REPO, 42).await.unwrap_err();
    assert!(matches!(err, ReviewError::Service(ServiceError::Transport(_))));
    assert!(o.service().calls().fetched.is_empty());
}

#[tokio::test]
async fn missing_and_removed_files_are_skipped() {
    let mut service = FakeService::new("alice").with_file(
        "src/add.js",
        sample_sources::CLEAN_JS,
        &all_added(sample_sources::CLEAN_JS),
    );
    service
        .files
        .push(sample_pull_requests::changed("src/ghost.js", sample_patches::EQ_LINE_ADDED));
    service.files.push(sample_pull_requests::removed("src/old.js"));
    let o = orchestrator(service, &sample_configs::empty());

    let result = o.review_pull_request(OWNER, REPO, 42).await.unwrap();

    assert_eq!(result.event, Some(ReviewEvent::Approve));
    assert_eq!(result.files.len(), 1);
    let fetched: Vec<String> = o
        .service()
        .calls()
        .fetched
        .iter()
        .map(|(p, _)| p.clone())
        .collect();
    assert_eq!(fetched, vec!["src/add.js", "src/ghost.js"]);
}

#[tokio::test]
async fn excluded_paths_are_not_analyzed() {
    let bundle = "eval(payload);\n";
    let service = FakeService::new("alice").with_file(
        "web/node_modules/pkg/index.js",
        bundle,
        &all_added(bundle),
    );
    let o = orchestrator(service, &sample_configs::empty());

    let result = o.review_pull_request(OWNER, REPO, 42).await.unwrap();

    assert_eq!(result.event, Some(ReviewEvent::Approve));
    assert!(result.files.is_empty());
}

// ── Conflicts ──────────────────────────────────────────────────

#[tokio::test]
async fn resolvable_conflict_is_committed_then_reviewed() {
    let service = FakeService::new("alice").with_file(
        "src/app.js",
        sample_sources::ONE_SIDED_CONFLICT,
        "@@ -1,1 +1,2 @@\n const a = 1;\n+const b = 2;\n",
    );
    let o = orchestrator(service, &sample_configs::empty());

    let result = o.review_pull_request(OWNER, REPO, 42).await.unwrap();

    assert_eq!(result.outcome, ReviewOutcome::Posted);
    assert_eq!(result.resolved_files, vec!["src/app.js"]);
    assert!(result.conflicts[0].resolved);
    let calls = o.service().calls();
    assert_eq!(calls.updates.len(), 1);
    assert_eq!(calls.updates[0].content, "const a = 1;\nconst b = 2;\n");
    assert_eq!(calls.updates[0].branch.as_deref(), Some("feature"));
    assert_eq!(calls.reviews.len(), 1);
    assert!(calls.reviews[0].1.contains("resolved automatically"));
}

#[tokio::test]
async fn resolved_file_is_analyzed_at_its_new_line_numbers() {
    let content = "\
<<<<<<< HEAD
=======
const limit = 10;
>>>>>>> feature
if (a == b) {
  go();
}
";
    let patch = "@@ -1,4 +1,5 @@\n <<<<<<< HEAD\n =======\n const limit = 10;\n >>>>>>> feature\n+if (a == b) {\n";
    let service = FakeService::new("alice").with_file("src/app.js", content, patch);
    let o = orchestrator(service, &sample_configs::hands_off());

    let result = o.review_pull_request(OWNER, REPO, 42).await.unwrap();

    assert_eq!(result.resolved_files, vec!["src/app.js"]);
    let eq = result
        .issues
        .iter()
        .find(|i| i.rule.as_deref() == Some("eqeqeq"))
        .expect("strict equality finding");
    assert_eq!(eq.line, 2);
    assert_eq!(eq.original_code, "if (a == b) {");
}

#[tokio::test]
async fn unresolvable_conflict_aborts_before_analysis() {
    let service = FakeService::new("alice")
        .with_file(
            "src/limits.js",
            sample_sources::HARD_CONFLICT,
            &all_added(sample_sources::HARD_CONFLICT),
        )
        .with_file(
            "src/check.js",
            sample_sources::EQ_AND_EVAL_JS,
            sample_patches::EQ_AND_EVAL_ADDED,
        );
    let o = orchestrator(service, &sample_configs::hands_off());

    let result = o.review_pull_request(OWNER, REPO, 42).await.unwrap();

    assert_eq!(result.outcome, ReviewOutcome::ConflictAborted);
    assert!(result.issues.is_empty());
    assert_eq!(result.pull_request.as_ref().map(|p| p.number), Some(42));
    assert_eq!(result.conflicts.len(), 1);
    assert!(!result.conflicts[0].resolved);
    assert_eq!(result.conflicts[0].sections.len(), 1);
    assert!(result.summary.contains("`src/limits.js` (unresolved)"));

    let calls = o.service().calls();
    assert!(calls.reviews.is_empty());
    assert!(calls.updates.is_empty());
    assert_eq!(calls.fetched.len(), 1, "scan stops at the first unresolved file");
}

// ── Sweep ──────────────────────────────────────────────────────

#[tokio::test]
async fn sweep_opens_tracking_issue() {
    let service = FakeService::new("alice")
        .with_content("src/app.js", "eval(userInput);\n")
        .with_issue(5, "Unrelated bug", "steps");
    let o = orchestrator(service, &sample_configs::empty());

    let result = o.review_repository_sweep(OWNER, REPO).await.unwrap();

    assert_eq!(result.outcome, ReviewOutcome::Sweep);
    assert_eq!(result.tracking_issue, Some(900));
    assert_eq!(result.files.len(), 1);
    let calls = o.service().calls();
    assert_eq!(calls.created_issues.len(), 1);
    assert!(calls.created_issues[0].0.starts_with("[prtriage]"));
    assert_eq!(calls.created_issues[0].1, vec!["prtriage"]);
    assert!(calls.fetched.iter().all(|(_, r)| r == "main"));
    assert_eq!(calls.fetched.len(), 5);
}

#[tokio::test]
async fn sweep_updates_existing_tracking_issue() {
    let body = format!("{TRACKING_ISSUE_MARKER}\nold findings");
    let service = FakeService::new("alice")
        .with_content("index.js", "eval(userInput);\n")
        .with_issue(12, "Retitled by a maintainer", &body);
    let o = orchestrator(service, &sample_configs::empty());

    let result = o.review_repository_sweep(OWNER, REPO).await.unwrap();

    assert_eq!(result.tracking_issue, Some(12));
    let calls = o.service().calls();
    assert_eq!(calls.updated_issues, vec![12]);
    assert!(calls.created_issues.is_empty());
}

#[tokio::test]
async fn clean_sweep_closes_tracking_issues() {
    let service = FakeService::new("alice")
        .with_content("src/index.js", sample_sources::CLEAN_JS)
        .with_issue(12, "[prtriage] 2 open finding(s) on main", "")
        .with_issue(13, "Unrelated bug", "steps");
    let o = orchestrator(service, &sample_configs::empty());

    let result = o.review_repository_sweep(OWNER, REPO).await.unwrap();

    assert_eq!(result.tracking_issue, None);
    assert_eq!(result.closed_tracking_issues, vec![12]);
    let calls = o.service().calls();
    assert_eq!(calls.comments, vec![12]);
    assert_eq!(calls.closed, vec![12]);
}

#[tokio::test]
async fn sweep_degrades_binary_content_to_no_findings() {
    let service = FakeService::new("alice").with_content("app.js", "\0\0\0binary");
    let o = orchestrator(service, &sample_configs::empty());

    let result = o.review_repository_sweep(OWNER, REPO).await.unwrap();

    assert!(result.issues.is_empty());
    assert_eq!(result.files.len(), 1);
    assert!(o.service().calls().created_issues.is_empty());
}
