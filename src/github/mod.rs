//! GitHub REST integration for scenario operations

mod api;
mod client;

pub use api::{
    CommentUser, IssueComment, MergeStatus, NewPullRequest, PullRequest, PullRequestApi,
    PullRequestRef, RefDeletion, WorkflowRun,
};
pub use client::{ApiResponse, GitHubClient, Method};

#[cfg(test)]
pub(crate) mod fake;
