//! Keep exactly one status comment per pull request.

use crate::error::Result;
use crate::github::{GithubClient, IssueComment};
use crate::report::STATUS_MARKER;

/// Login the Actions runtime posts comments as.
pub const BOT_LOGIN: &str = "github-actions[bot]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created(u64),
    Updated(u64),
}

fn is_status_comment(comment: &IssueComment) -> bool {
    comment.user.as_ref().is_some_and(|u| u.login == BOT_LOGIN)
        && comment
            .body
            .as_deref()
            .is_some_and(|b| b.contains(STATUS_MARKER))
}

/// Update the first bot comment carrying the marker, or create one.
pub async fn reconcile_status_comment(
    client: &GithubClient,
    pr_number: u64,
    body: &str,
) -> Result<ReconcileOutcome> {
    let comments = client.list_issue_comments(pr_number).await?;
    match comments.iter().find(|c| is_status_comment(c)) {
        Some(existing) => {
            let id = client.update_issue_comment(existing.id, body).await?;
            tracing::info!(comment_id = id, pr = pr_number, "updated existing PR comment");
            Ok(ReconcileOutcome::Updated(id))
        }
        None => {
            let id = client.create_issue_comment(pr_number, body).await?;
            tracing::info!(comment_id = id, pr = pr_number, "created new PR comment");
            Ok(ReconcileOutcome::Created(id))
        }
    }
}

/// [`reconcile_status_comment`] that logs failures instead of returning them.
pub async fn post_status_comment(
    client: &GithubClient,
    pr_number: u64,
    body: &str,
) -> Option<ReconcileOutcome> {
    match reconcile_status_comment(client, pr_number, body).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::warn!(error = %e, pr = pr_number, "failed to create PR comment");
            None
        }
    }
}
