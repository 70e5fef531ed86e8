//! Minimal GitHub REST client for commit statuses, deployments and PR comments.

use crate::error::{DeployError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

const PAGE_SIZE: usize = 100;
const API_VERSION: &str = "2022-11-28";
const CLIENT_AGENT: &str = "studio-deploy";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<GithubUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Success,
    Failure,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    Success,
    Failure,
    InProgress,
}

#[derive(Deserialize)]
struct Created {
    id: u64,
}

// ---------------------------------------------------------------------------
// GithubClient
// ---------------------------------------------------------------------------

/// One authenticated client per run, scoped to a single repository.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
}

impl GithubClient {
    pub fn new(api_base: &str, token: &str, repo: RepoRef) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|_| {
            DeployError::InvalidInput("GITHUB_TOKEN is not a valid header value".to_string())
        })?;
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.repo.owner, self.repo.name, tail
        )
    }

    /// All comments on an issue or PR, oldest first.
    pub async fn list_issue_comments(&self, issue_number: u64) -> Result<Vec<IssueComment>> {
        let url = self.repo_url(&format!("issues/{issue_number}/comments"));
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let request = self.http.get(&url).query(&[
                ("per_page", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ]);
            let chunk: Vec<IssueComment> = send_json("list issue comments", request).await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    pub async fn create_issue_comment(&self, issue_number: u64, body: &str) -> Result<u64> {
        let request = self
            .http
            .post(self.repo_url(&format!("issues/{issue_number}/comments")))
            .json(&json!({ "body": body }));
        let created: Created = send_json("create issue comment", request).await?;
        Ok(created.id)
    }

    pub async fn update_issue_comment(&self, comment_id: u64, body: &str) -> Result<u64> {
        let request = self
            .http
            .patch(self.repo_url(&format!("issues/comments/{comment_id}")))
            .json(&json!({ "body": body }));
        let updated: Created = send_json("update issue comment", request).await?;
        Ok(updated.id)
    }

    pub async fn create_commit_status(
        &self,
        sha: &str,
        state: CommitState,
        description: &str,
        context: &str,
    ) -> Result<()> {
        let request = self
            .http
            .post(self.repo_url(&format!("statuses/{sha}")))
            .json(&json!({
                "state": state,
                "description": description,
                "context": context,
            }));
        send("create commit status", request).await?;
        Ok(())
    }

    /// Create a deployment record for `git_ref`. Previews are transient and
    /// never production.
    pub async fn create_deployment(
        &self,
        git_ref: &str,
        environment: &str,
        is_preview: bool,
    ) -> Result<u64> {
        let request = self.http.post(self.repo_url("deployments")).json(&json!({
            "ref": git_ref,
            "environment": environment,
            "auto_merge": false,
            "required_contexts": [],
            "transient_environment": is_preview,
            "production_environment": !is_preview,
        }));
        let created: Created = send_json("create deployment", request).await?;
        Ok(created.id)
    }

    pub async fn create_deployment_status(
        &self,
        deployment_id: u64,
        state: DeploymentState,
        environment_url: &str,
        description: &str,
    ) -> Result<()> {
        let request = self
            .http
            .post(self.repo_url(&format!("deployments/{deployment_id}/statuses")))
            .json(&json!({
                "state": state,
                "environment_url": environment_url,
                "description": description,
            }));
        send("create deployment status", request).await?;
        Ok(())
    }
}

async fn send(operation: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DeployError::Api {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    })
}

async fn send_json<T: DeserializeOwned>(
    operation: &str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let response = send(operation, request).await?;
    Ok(response.json::<T>().await?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard) -> GithubClient {
        GithubClient::new(&server.url(), "test-token", RepoRef::new("acme", "studio")).unwrap()
    }

    fn comments_json(start: u64, count: u64) -> String {
        let rows: Vec<_> = (start..start + count)
            .map(|id| json!({"id": id, "body": format!("comment {id}"), "user": {"login": "someone"}}))
            .collect();
        serde_json::to_string(&rows).unwrap()
    }

    #[tokio::test]
    async fn lists_comments_across_pages() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/repos/acme/studio/issues/7/comments")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .match_header("authorization", "Bearer test-token")
            .match_header("accept", "application/vnd.github+json")
            .with_body(comments_json(1, 100))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/acme/studio/issues/7/comments")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_body(comments_json(101, 3))
            .create_async()
            .await;

        let comments = client(&server).list_issue_comments(7).await.unwrap();
        assert_eq!(comments.len(), 103);
        assert_eq!(comments[102].id, 103);
        assert_eq!(comments[0].user.as_ref().unwrap().login, "someone");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn creates_and_updates_comments() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/repos/acme/studio/issues/7/comments")
            .match_body(Matcher::Json(json!({"body": "hello"})))
            .with_status(201)
            .with_body(r#"{"id": 55}"#)
            .create_async()
            .await;
        let update = server
            .mock("PATCH", "/repos/acme/studio/issues/comments/55")
            .match_body(Matcher::Json(json!({"body": "again"})))
            .with_body(r#"{"id": 55}"#)
            .create_async()
            .await;

        let gh = client(&server);
        assert_eq!(gh.create_issue_comment(7, "hello").await.unwrap(), 55);
        assert_eq!(gh.update_issue_comment(55, "again").await.unwrap(), 55);
        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn posts_commit_status() {
        let mut server = mockito::Server::new_async().await;
        let status = server
            .mock("POST", "/repos/acme/studio/statuses/abc123")
            .match_body(Matcher::Json(json!({
                "state": "pending",
                "description": "Deploying studio",
                "context": "sanity/preview",
            })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        client(&server)
            .create_commit_status("abc123", CommitState::Pending, "Deploying studio", "sanity/preview")
            .await
            .unwrap();
        status.assert_async().await;
    }

    #[tokio::test]
    async fn creates_preview_deployment_with_status() {
        let mut server = mockito::Server::new_async().await;
        let deployment = server
            .mock("POST", "/repos/acme/studio/deployments")
            .match_body(Matcher::PartialJson(json!({
                "ref": "feature/x",
                "environment": "preview-studio",
                "transient_environment": true,
                "production_environment": false,
            })))
            .with_status(201)
            .with_body(r#"{"id": 9001}"#)
            .create_async()
            .await;
        let deployment_status = server
            .mock("POST", "/repos/acme/studio/deployments/9001/statuses")
            .match_body(Matcher::Json(json!({
                "state": "success",
                "environment_url": "https://movies--x.sanity.studio",
                "description": "studio deployed",
            })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        let gh = client(&server);
        let id = gh
            .create_deployment("feature/x", "preview-studio", true)
            .await
            .unwrap();
        assert_eq!(id, 9001);
        gh.create_deployment_status(
            id,
            DeploymentState::Success,
            "https://movies--x.sanity.studio",
            "studio deployed",
        )
        .await
        .unwrap();
        deployment.assert_async().await;
        deployment_status.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/repos/acme/studio/statuses/abc")
            .with_status(403)
            .with_body("Resource not accessible by integration")
            .create_async()
            .await;

        let err = client(&server)
            .create_commit_status("abc", CommitState::Failure, "failed", "sanity/preview")
            .await
            .unwrap_err();
        match err {
            DeployError::Api {
                operation,
                status,
                body,
            } => {
                assert_eq!(operation, "create commit status");
                assert_eq!(status, 403);
                assert!(body.contains("not accessible"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn repo_slug() {
        assert_eq!(RepoRef::new("acme", "studio").slug(), "acme/studio");
    }
}
