//! Typed pull-request, comment, workflow-run and ref operations.
//!
//! `PullRequestApi` is the seam between the scenario and the hosting
//! platform; `GitHubClient` implements it over REST.

use super::client::{ApiResponse, GitHubClient, Method};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Payload for `POST /repos/{repo}/pulls`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    /// Head branch
    pub head: String,
    /// Base branch
    pub base: String,
    /// Title
    pub title: String,
    /// Body; `null` when unset
    pub body: Option<String>,
}

/// Branch tip of a pull request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestRef {
    /// Commit SHA
    pub sha: String,
    /// Branch name
    #[serde(rename = "ref")]
    pub branch: String,
}

/// Pull request as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Head branch tip
    pub head: PullRequestRef,
    /// Web URL
    #[serde(default)]
    pub html_url: Option<String>,
    /// `null` while the platform is still computing mergeability
    #[serde(default)]
    pub mergeable: Option<bool>,
    /// `open` or `closed`
    #[serde(default)]
    pub state: Option<String>,
}

/// Comment author
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommentUser {
    /// Login name
    pub login: String,
}

/// Issue comment posted on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueComment {
    /// Comment id
    pub id: u64,
    /// Markdown body
    #[serde(default)]
    pub body: String,
    /// Author
    #[serde(default)]
    pub user: Option<CommentUser>,
}

/// Workflow run summary
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowRun {
    /// Run id
    pub id: u64,
    /// Workflow name
    #[serde(default)]
    pub name: Option<String>,
    /// Commit the run was triggered for
    pub head_sha: String,
    /// Branch the run was triggered for
    #[serde(default)]
    pub head_branch: Option<String>,
    /// `queued`, `in_progress`, `completed`, ...
    #[serde(default)]
    pub status: Option<String>,
    /// `null` until the run completes
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunPage {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct BranchEntry {
    name: String,
}

/// Merge state reported by `GET /repos/{repo}/pulls/{n}/merge`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    /// 204/200: the PR has been merged
    Merged,
    /// 404: the PR has not been merged
    NotMerged,
}

/// Outcome of a ref deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefDeletion {
    /// The ref existed and was deleted
    Deleted,
    /// The ref did not exist
    AlreadyGone,
}

/// Remote operations the scenario needs from the hosting platform
pub trait PullRequestApi {
    /// Open a pull request
    fn create_pull_request(
        &self,
        repo: &str,
        request: &NewPullRequest,
    ) -> impl Future<Output = Result<PullRequest>>;

    /// Fetch a pull request
    fn get_pull_request(&self, repo: &str, number: u64) -> impl Future<Output = Result<PullRequest>>;

    /// Whether the pull request has been merged
    fn pull_merge_status(&self, repo: &str, number: u64)
    -> impl Future<Output = Result<MergeStatus>>;

    /// Comments on the pull request's issue, oldest first
    fn issue_comments(
        &self,
        repo: &str,
        number: u64,
    ) -> impl Future<Output = Result<Vec<IssueComment>>>;

    /// Workflow runs triggered for `head_sha`
    fn workflow_runs_for_sha(
        &self,
        repo: &str,
        head_sha: &str,
    ) -> impl Future<Output = Result<Vec<WorkflowRun>>>;

    /// Fetch one workflow run
    fn get_workflow_run(&self, repo: &str, run_id: u64) -> impl Future<Output = Result<WorkflowRun>>;

    /// Names of all branches in the repository
    fn list_branch_names(&self, repo: &str) -> impl Future<Output = Result<Vec<String>>>;

    /// Delete `refs/heads/{branch}`
    fn delete_branch(&self, repo: &str, branch: &str) -> impl Future<Output = Result<RefDeletion>>;
}

const PAGE_SIZE: usize = 100;

impl GitHubClient {
    async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.call(Method::Get, path, None).await
    }
}

impl PullRequestApi for GitHubClient {
    async fn create_pull_request(&self, repo: &str, request: &NewPullRequest) -> Result<PullRequest> {
        let body = serde_json::to_value(request)?;
        log::info!(
            "Create PR with chart files from '{repo}:{}' into '{}'",
            request.head,
            request.base
        );
        self.call(Method::Post, &format!("repos/{repo}/pulls"), Some(&body))
            .await?
            .expect_json(Method::Post)
    }

    async fn get_pull_request(&self, repo: &str, number: u64) -> Result<PullRequest> {
        self.get(&format!("repos/{repo}/pulls/{number}"))
            .await?
            .expect_json(Method::Get)
    }

    async fn pull_merge_status(&self, repo: &str, number: u64) -> Result<MergeStatus> {
        let response = self.get(&format!("repos/{repo}/pulls/{number}/merge")).await?;
        match response.status {
            200 | 204 => Ok(MergeStatus::Merged),
            404 => Ok(MergeStatus::NotMerged),
            _ => Err(response.unexpected(Method::Get)),
        }
    }

    async fn issue_comments(&self, repo: &str, number: u64) -> Result<Vec<IssueComment>> {
        let response = self.get(&format!("repos/{repo}/issues/{number}/comments")).await?;
        log::info!("Comments for #{number}: status {}", response.status);
        response.expect_json(Method::Get)
    }

    async fn workflow_runs_for_sha(&self, repo: &str, head_sha: &str) -> Result<Vec<WorkflowRun>> {
        let page: WorkflowRunPage = self
            .get(&format!(
                "repos/{repo}/actions/runs?head_sha={head_sha}&per_page={PAGE_SIZE}"
            ))
            .await?
            .expect_json(Method::Get)?;
        Ok(page.workflow_runs)
    }

    async fn get_workflow_run(&self, repo: &str, run_id: u64) -> Result<WorkflowRun> {
        self.get(&format!("repos/{repo}/actions/runs/{run_id}"))
            .await?
            .expect_json(Method::Get)
    }

    async fn list_branch_names(&self, repo: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for page in 1.. {
            let entries: Vec<BranchEntry> = self
                .get(&format!(
                    "repos/{repo}/branches?per_page={PAGE_SIZE}&page={page}"
                ))
                .await?
                .expect_json(Method::Get)?;
            let last = entries.len() < PAGE_SIZE;
            names.extend(entries.into_iter().map(|b| b.name));
            if last {
                break;
            }
        }
        Ok(names)
    }

    async fn delete_branch(&self, repo: &str, branch: &str) -> Result<RefDeletion> {
        let response = self
            .call(
                Method::Delete,
                &format!("repos/{repo}/git/refs/heads/{branch}"),
                None,
            )
            .await?;
        match response.status {
            200..=299 => Ok(RefDeletion::Deleted),
            // 422 "Reference does not exist"
            404 | 422 => Ok(RefDeletion::AlreadyGone),
            _ => Err(response.unexpected(Method::Delete)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_decodes_head_ref() {
        let pr: PullRequest = serde_json::from_str(
            r#"{
                "number": 31,
                "state": "open",
                "mergeable": null,
                "html_url": "https://github.com/acme/sandbox/pull/31",
                "head": {"sha": "abc123", "ref": "partner-acme-x-pr", "label": "acme:x"}
            }"#,
        )
        .unwrap();
        assert_eq!(pr.number, 31);
        assert_eq!(pr.head.sha, "abc123");
        assert_eq!(pr.head.branch, "partner-acme-x-pr");
        assert_eq!(pr.mergeable, None);
    }

    #[test]
    fn test_workflow_run_page_decodes() {
        let page: WorkflowRunPage = serde_json::from_str(
            r#"{
                "total_count": 1,
                "workflow_runs": [{
                    "id": 99,
                    "name": "CI",
                    "head_sha": "abc123",
                    "head_branch": "partner-acme-x-pr",
                    "status": "in_progress",
                    "conclusion": null,
                    "created_at": "2026-01-02T03:04:05Z"
                }]
            }"#,
        )
        .unwrap();
        let run = &page.workflow_runs[0];
        assert_eq!(run.id, 99);
        assert_eq!(run.conclusion, None);
        assert_eq!(run.status.as_deref(), Some("in_progress"));
        assert!(run.created_at.is_some());
    }

    #[test]
    fn test_new_pull_request_serializes_null_body() {
        let value = serde_json::to_value(NewPullRequest {
            head: "b-pr".into(),
            base: "b".into(),
            title: "b-pr".into(),
            body: None,
        })
        .unwrap();
        assert_eq!(value["head"], "b-pr");
        assert!(value["body"].is_null());
    }

    #[test]
    fn test_comment_without_body_defaults_empty() {
        let comments: Vec<IssueComment> =
            serde_json::from_str(r#"[{"id": 1, "user": {"login": "bot"}}]"#).unwrap();
        assert_eq!(comments[0].body, "");
        assert_eq!(comments[0].user.as_ref().map(|u| u.login.as_str()), Some("bot"));
    }
}
