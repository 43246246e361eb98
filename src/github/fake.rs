//! Scripted in-process `PullRequestApi` used by unit tests.

use super::api::{
    IssueComment, MergeStatus, NewPullRequest, PullRequest, PullRequestApi, PullRequestRef,
    RefDeletion, WorkflowRun,
};
use crate::error::{GitHubError, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A scripted reply: `Ok` value or an HTTP status turned into an error
pub(crate) type Reply<T> = std::result::Result<T, u16>;

/// Replies are consumed front to back; the last one repeats forever.
#[derive(Debug)]
pub(crate) struct Script<T: Clone>(Mutex<VecDeque<Reply<T>>>);

impl<T: Clone> Default for Script<T> {
    fn default() -> Self {
        Script(Mutex::new(VecDeque::new()))
    }
}

impl<T: Clone> Script<T> {
    pub(crate) fn push(&self, reply: Reply<T>) -> &Self {
        self.0.lock().unwrap().push_back(reply);
        self
    }

    fn next(&self, path: &str) -> Result<T> {
        let mut queue = self.0.lock().unwrap();
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match reply {
            Some(Ok(value)) => Ok(value),
            Some(Err(status)) => Err(GitHubError::UnexpectedStatus {
                method: "GET".to_string(),
                path: path.to_string(),
                status,
                body: String::new(),
            }
            .into()),
            None => panic!("no scripted reply for {path}"),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    pub pull_requests: Script<PullRequest>,
    pub runs_for_sha: Script<Vec<WorkflowRun>>,
    pub run: Script<WorkflowRun>,
    pub merge_status: Script<MergeStatus>,
    pub comments: Script<Vec<IssueComment>>,
    pub branches: Script<Vec<String>>,
    pub created: Mutex<Vec<NewPullRequest>>,
    pub deleted: Mutex<Vec<String>>,
}

pub(crate) fn pull_request(number: u64, sha: &str, branch: &str) -> PullRequest {
    PullRequest {
        number,
        head: PullRequestRef {
            sha: sha.to_string(),
            branch: branch.to_string(),
        },
        html_url: None,
        mergeable: None,
        state: Some("open".to_string()),
    }
}

pub(crate) fn workflow_run(
    id: u64,
    name: &str,
    sha: &str,
    status: &str,
    conclusion: Option<&str>,
) -> WorkflowRun {
    WorkflowRun {
        id,
        name: Some(name.to_string()),
        head_sha: sha.to_string(),
        head_branch: None,
        status: Some(status.to_string()),
        conclusion: conclusion.map(str::to_string),
        created_at: None,
    }
}

pub(crate) fn comment(id: u64, body: &str) -> IssueComment {
    IssueComment {
        id,
        body: body.to_string(),
        user: None,
    }
}

impl PullRequestApi for FakeApi {
    async fn create_pull_request(&self, repo: &str, request: &NewPullRequest) -> Result<PullRequest> {
        self.created.lock().unwrap().push(request.clone());
        self.pull_requests.next(&format!("repos/{repo}/pulls"))
    }

    async fn get_pull_request(&self, repo: &str, number: u64) -> Result<PullRequest> {
        self.pull_requests.next(&format!("repos/{repo}/pulls/{number}"))
    }

    async fn pull_merge_status(&self, repo: &str, number: u64) -> Result<MergeStatus> {
        self.merge_status
            .next(&format!("repos/{repo}/pulls/{number}/merge"))
    }

    async fn issue_comments(&self, repo: &str, number: u64) -> Result<Vec<IssueComment>> {
        self.comments
            .next(&format!("repos/{repo}/issues/{number}/comments"))
    }

    async fn workflow_runs_for_sha(&self, repo: &str, _head_sha: &str) -> Result<Vec<WorkflowRun>> {
        self.runs_for_sha.next(&format!("repos/{repo}/actions/runs"))
    }

    async fn get_workflow_run(&self, repo: &str, run_id: u64) -> Result<WorkflowRun> {
        self.run.next(&format!("repos/{repo}/actions/runs/{run_id}"))
    }

    async fn list_branch_names(&self, repo: &str) -> Result<Vec<String>> {
        self.branches.next(&format!("repos/{repo}/branches"))
    }

    async fn delete_branch(&self, _repo: &str, branch: &str) -> Result<RefDeletion> {
        self.deleted.lock().unwrap().push(branch.to_string());
        Ok(RefDeletion::Deleted)
    }
}
