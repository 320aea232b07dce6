//! Review orchestration: fetch a pull request through a [`CollaborationService`],
//! resolve or report conflicts, analyze the changed lines and post a verdict.

mod render;
mod review;
mod service;
mod settings;
mod sweep;

pub use render::{
    IssueGroup, group_issues, render_analysis, render_conflict_report, render_review,
    render_tracking_closed, render_tracking_issue, tracking_issue_title, verdict,
};
pub use review::{ReviewError, ReviewOrchestrator};
pub use service::{CollaborationService, ServiceError};
pub use settings::{PathFilterError, ReviewSettings, compile_exclude_globs};
pub use sweep::is_tracking_issue;
