//! Git workflow driver for staging a submission on two branches.
//!
//! Phases advance strictly forward:
//! `Init → WorktreeCreated → BasePushed → PrPushed → PrOpened`, and
//! `TornDown` is reachable from every phase. Teardown is the finalizer the
//! scenario runner calls on every exit path.

use super::cli::GitCli;
use super::operations::{CommitIdentity, GitOperations};
use super::workspace::{WORKTREE_PREFIX, Workspace};
use crate::error::{GitError, Result};
use path_absolutize::Absolutize;
use std::fmt;
use std::path::Path;

/// Phase of the per-run git workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkflowPhase {
    /// Nothing created yet
    Init,
    /// Scratch worktree exists
    WorktreeCreated,
    /// Base branch (OWNERS) pushed
    BasePushed,
    /// PR branch (chart + report) pushed
    PrPushed,
    /// Pull request opened against the base branch
    PrOpened,
    /// Worktree removed and run branches deleted
    TornDown,
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl WorkflowPhase {
    fn successor(self) -> Option<Self> {
        match self {
            WorkflowPhase::Init => Some(WorkflowPhase::WorktreeCreated),
            WorkflowPhase::WorktreeCreated => Some(WorkflowPhase::BasePushed),
            WorkflowPhase::BasePushed => Some(WorkflowPhase::PrPushed),
            WorkflowPhase::PrPushed => Some(WorkflowPhase::PrOpened),
            WorkflowPhase::PrOpened | WorkflowPhase::TornDown => None,
        }
    }
}

/// Drives worktree creation, commits, and pushes for one run
#[derive(Debug)]
pub struct GitWorkflow {
    git: GitCli,
    push_url: String,
    identity: CommitIdentity,
    phase: WorkflowPhase,
}

impl GitWorkflow {
    /// `push_url` is the token-embedded remote of the test repository
    pub fn new(git: GitCli, push_url: String, identity: CommitIdentity) -> Self {
        Self {
            git,
            push_url,
            identity,
            phase: WorkflowPhase::Init,
        }
    }

    /// Current phase
    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    /// Underlying git runner
    pub fn git(&self) -> &GitCli {
        &self.git
    }

    fn advance(&mut self, to: WorkflowPhase) -> Result<()> {
        if self.phase.successor() != Some(to) {
            return Err(GitError::InvalidTransition {
                from: self.phase.to_string(),
                to: to.to_string(),
            }
            .into());
        }
        log::debug!("Git workflow {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    fn require(&self, allowed: &[WorkflowPhase], action: &str) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(GitError::InvalidTransition {
                from: self.phase.to_string(),
                to: action.to_string(),
            }
            .into())
        }
    }

    /// Commit pending changes in the invoking repository as a checkpoint
    pub async fn checkpoint_local_changes(&self, repo_path: &Path) -> Result<bool> {
        self.require(&[WorkflowPhase::Init], "checkpoint")?;
        let committed = self
            .git
            .commit_all(repo_path, "Checkpoint", &self.identity)
            .await?;
        if committed {
            log::info!("Committed local changes as 'Checkpoint'");
        }
        Ok(committed)
    }

    /// Push the invoking repository's HEAD to `branch` on the test repository
    pub async fn publish_head(&self, repo_path: &Path, branch: &str) -> Result<()> {
        self.require(&[WorkflowPhase::Init], "publish head")?;
        self.git.push_head(repo_path, &self.push_url, branch).await
    }

    /// Create the detached scratch worktree and check out `base_branch` in it
    pub async fn create_worktree(&mut self, repo_path: &Path, base_branch: &str) -> Result<Workspace> {
        self.require(&[WorkflowPhase::Init], "create worktree")?;

        let repo_path = repo_path.absolutize()?.to_path_buf();
        let temp = tempfile::Builder::new()
            .prefix(WORKTREE_PREFIX)
            .tempdir()?;
        log::info!("Worktree directory: {}", temp.path().display());

        self.git.worktree_add_detached(&repo_path, temp.path()).await?;
        let workspace = Workspace::new(repo_path, temp, self.git.binary().to_path_buf());

        self.git
            .checkout_new_branch(workspace.worktree_path(), base_branch)
            .await?;
        self.advance(WorkflowPhase::WorktreeCreated)?;
        Ok(workspace)
    }

    /// Untrack and delete `relative` in the worktree; commit and push the
    /// removal to `branch` only when something was tracked
    pub async fn reset_path(
        &self,
        workspace: &Workspace,
        relative: &Path,
        branch: &str,
    ) -> Result<bool> {
        self.require(
            &[WorkflowPhase::WorktreeCreated, WorkflowPhase::BasePushed],
            "reset path",
        )?;

        let dir = workspace.worktree_path();
        let tracked = self.git.tracked_files(dir, relative).await?;

        let on_disk = workspace.in_worktree(relative);
        if on_disk.is_dir() {
            tokio::fs::remove_dir_all(&on_disk).await?;
        } else if on_disk.exists() {
            tokio::fs::remove_file(&on_disk).await?;
        }

        if tracked.is_empty() {
            log::debug!("Nothing tracked at {}; reset is a no-op", relative.display());
            return Ok(false);
        }

        log::info!("Remove {} from {}", relative.display(), branch);
        self.git.remove_cached(dir, relative).await?;
        if !self.git.has_staged_changes(dir).await? {
            return Ok(false);
        }
        self.git
            .commit(dir, &format!("Remove {}", relative.display()), &self.identity)
            .await?;
        self.git.push_head(dir, &self.push_url, branch).await?;
        Ok(true)
    }

    async fn commit_and_push(
        &self,
        workspace: &Workspace,
        paths: &[&Path],
        message: &str,
        branch: &str,
    ) -> Result<()> {
        let dir = workspace.worktree_path();
        self.git.add(dir, paths).await?;
        self.git.commit(dir, message, &self.identity).await?;
        self.git.push_head(dir, &self.push_url, branch).await
    }

    /// Commit `paths` and push them to the base branch
    pub async fn push_base(
        &mut self,
        workspace: &Workspace,
        paths: &[&Path],
        message: &str,
        branch: &str,
    ) -> Result<()> {
        self.require(&[WorkflowPhase::WorktreeCreated], "push base branch")?;
        self.commit_and_push(workspace, paths, message, branch).await?;
        self.advance(WorkflowPhase::BasePushed)
    }

    /// Commit `paths` on top of the base branch and push them to the PR branch
    pub async fn push_pr(
        &mut self,
        workspace: &Workspace,
        paths: &[&Path],
        message: &str,
        branch: &str,
    ) -> Result<()> {
        self.require(&[WorkflowPhase::BasePushed], "push PR branch")?;
        self.commit_and_push(workspace, paths, message, branch).await?;
        self.advance(WorkflowPhase::PrPushed)
    }

    /// Record that the pull request exists
    pub fn mark_pr_opened(&mut self) -> Result<()> {
        self.advance(WorkflowPhase::PrOpened)
    }

    /// Remove the worktree, prune stale registrations, and delete local
    /// branches. Never fails; problems are returned as warnings.
    pub async fn teardown(
        &mut self,
        repo_path: &Path,
        workspace: Option<Workspace>,
        local_branches: &[String],
    ) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(mut workspace) = workspace {
            match self
                .git
                .worktree_remove(workspace.repo_path(), workspace.worktree_path())
                .await
            {
                Ok(()) => workspace.disarm(),
                Err(e) => warnings.push(format!("worktree remove: {e}")),
            }
        }

        if let Err(e) = self.git.worktree_prune(repo_path).await {
            warnings.push(format!("worktree prune: {e}"));
        }

        for branch in local_branches {
            log::info!("Delete local '{branch}'");
            if let Err(e) = self.git.delete_local_branch(repo_path, branch).await {
                warnings.push(format!("delete local branch '{branch}': {e}"));
            }
        }

        self.phase = WorkflowPhase::TornDown;
        warnings
    }
}
