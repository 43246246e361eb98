//! Git operations trait and its `git` CLI implementation.
//!
//! Every method takes the directory it acts on, so callers decide whether
//! an operation targets the invoking repository or the scratch worktree.

use super::cli::GitCli;
use crate::error::{GitError, Result};
use std::future::Future;
use std::path::Path;

/// Author/committer identity applied per commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    /// user.name
    pub name: String,
    /// user.email
    pub email: String,
}

/// Git operations needed to stage a chart submission
pub trait GitOperations {
    /// Abbreviated SHA of HEAD
    fn short_head(&self, dir: &Path) -> impl Future<Output = Result<String>>;

    /// Current branch, `None` when HEAD is detached
    fn current_branch(&self, dir: &Path) -> impl Future<Output = Result<Option<String>>>;

    /// Names of local branches
    fn local_branches(&self, dir: &Path) -> impl Future<Output = Result<Vec<String>>>;

    /// `git checkout -b <name>`
    fn checkout_new_branch(&self, dir: &Path, name: &str) -> impl Future<Output = Result<()>>;

    /// Stage paths
    fn add(&self, dir: &Path, paths: &[&Path]) -> impl Future<Output = Result<()>>;

    /// Unstage and untrack `path` recursively; missing paths are not an error
    fn remove_cached(&self, dir: &Path, path: &Path) -> impl Future<Output = Result<()>>;

    /// Tracked files under `path`
    fn tracked_files(&self, dir: &Path, path: &Path) -> impl Future<Output = Result<Vec<String>>>;

    /// Whether the index differs from HEAD
    fn has_staged_changes(&self, dir: &Path) -> impl Future<Output = Result<bool>>;

    /// Commit the index
    fn commit(
        &self,
        dir: &Path,
        message: &str,
        identity: &CommitIdentity,
    ) -> impl Future<Output = Result<()>>;

    /// Stage everything and commit; no-op when the tree is clean
    fn commit_all(
        &self,
        dir: &Path,
        message: &str,
        identity: &CommitIdentity,
    ) -> impl Future<Output = Result<bool>>;

    /// Force-push HEAD to `refs/heads/<branch>` at `url`
    fn push_head(&self, dir: &Path, url: &str, branch: &str) -> impl Future<Output = Result<()>>;

    /// `git worktree add --detach <path> HEAD`
    fn worktree_add_detached(&self, dir: &Path, path: &Path) -> impl Future<Output = Result<()>>;

    /// `git worktree remove --force <path>`
    fn worktree_remove(&self, dir: &Path, path: &Path) -> impl Future<Output = Result<()>>;

    /// `git worktree prune`
    fn worktree_prune(&self, dir: &Path) -> impl Future<Output = Result<()>>;

    /// `git branch -D <name>`
    fn delete_local_branch(&self, dir: &Path, name: &str) -> impl Future<Output = Result<()>>;
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        GitError::CommandFailed {
            command: "git".to_string(),
            stderr: format!("non UTF-8 path: {}", path.display()),
        }
        .into()
    })
}

impl GitOperations for GitCli {
    async fn short_head(&self, dir: &Path) -> Result<String> {
        self.run_ok(dir, &["rev-parse", "--short", "HEAD"]).await
    }

    async fn current_branch(&self, dir: &Path) -> Result<Option<String>> {
        let output = self.run(dir, &["symbolic-ref", "--quiet", "--short", "HEAD"]).await?;
        match output.code {
            Some(0) => Ok(Some(output.stdout)),
            // exit 1: HEAD is detached
            Some(1) => Ok(None),
            _ => Err(GitError::NotRepository {
                path: dir.to_path_buf(),
            }
            .into()),
        }
    }

    async fn local_branches(&self, dir: &Path) -> Result<Vec<String>> {
        let out = self
            .run_ok(dir, &["for-each-ref", "--format=%(refname:short)", "refs/heads"])
            .await?;
        Ok(out.lines().map(str::to_string).collect())
    }

    async fn checkout_new_branch(&self, dir: &Path, name: &str) -> Result<()> {
        self.run_ok(dir, &["checkout", "-q", "-b", name]).await.map(drop)
    }

    async fn add(&self, dir: &Path, paths: &[&Path]) -> Result<()> {
        let mut args = vec!["add", "--force", "--"];
        for path in paths {
            args.push(path_arg(path)?);
        }
        self.run_ok(dir, &args).await.map(drop)
    }

    async fn remove_cached(&self, dir: &Path, path: &Path) -> Result<()> {
        self.run_ok(
            dir,
            &["rm", "-r", "-q", "--cached", "--ignore-unmatch", "--", path_arg(path)?],
        )
        .await
        .map(drop)
    }

    async fn tracked_files(&self, dir: &Path, path: &Path) -> Result<Vec<String>> {
        let out = self.run_ok(dir, &["ls-files", "--", path_arg(path)?]).await?;
        Ok(out
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn has_staged_changes(&self, dir: &Path) -> Result<bool> {
        let output = self.run(dir, &["diff", "--cached", "--quiet"]).await?;
        match output.code {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(GitError::CommandFailed {
                command: "git diff --cached --quiet".to_string(),
                stderr: output.stderr,
            }
            .into()),
        }
    }

    async fn commit(&self, dir: &Path, message: &str, identity: &CommitIdentity) -> Result<()> {
        let name = format!("user.name={}", identity.name);
        let email = format!("user.email={}", identity.email);
        self.run_ok(
            dir,
            &["-c", &name, "-c", &email, "commit", "-q", "--no-verify", "-m", message],
        )
        .await
        .map(drop)
    }

    async fn commit_all(&self, dir: &Path, message: &str, identity: &CommitIdentity) -> Result<bool> {
        self.run_ok(dir, &["add", "-A"]).await?;
        if !self.has_staged_changes(dir).await? {
            return Ok(false);
        }
        self.commit(dir, message, identity).await?;
        Ok(true)
    }

    async fn push_head(&self, dir: &Path, url: &str, branch: &str) -> Result<()> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        let output = self.run(dir, &["push", "-q", "-f", url, &refspec]).await?;
        if output.success() {
            Ok(())
        } else {
            Err(GitError::PushFailed {
                refspec,
                reason: output.stderr,
            }
            .into())
        }
    }

    async fn worktree_add_detached(&self, dir: &Path, path: &Path) -> Result<()> {
        self.run_ok(dir, &["worktree", "add", "--detach", path_arg(path)?, "HEAD"])
            .await
            .map(drop)
    }

    async fn worktree_remove(&self, dir: &Path, path: &Path) -> Result<()> {
        self.run_ok(dir, &["worktree", "remove", "--force", path_arg(path)?])
            .await
            .map(drop)
    }

    async fn worktree_prune(&self, dir: &Path) -> Result<()> {
        self.run_ok(dir, &["worktree", "prune"]).await.map(drop)
    }

    async fn delete_local_branch(&self, dir: &Path, name: &str) -> Result<()> {
        self.run_ok(dir, &["branch", "-D", name]).await.map(drop)
    }
}
