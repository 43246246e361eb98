//! Caller-owned workspace handle for one scenario run.
//!
//! The submission is staged in a detached worktree inside a temporary
//! directory, so the invoking repository's own checkout is never touched.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use wait_timeout::ChildExt;

/// Prefix of the temporary worktree directory
pub const WORKTREE_PREFIX: &str = "tci-";

/// Repository path plus the scratch worktree created from it
#[derive(Debug)]
pub struct Workspace {
    repo_path: PathBuf,
    // Declared before `worktree` so git unregisters the worktree before the
    // directory is deleted.
    guard: WorktreeGuard,
    worktree: TempDir,
}

impl Workspace {
    pub(super) fn new(repo_path: PathBuf, worktree: TempDir, git: PathBuf) -> Self {
        let guard = WorktreeGuard {
            git,
            repo_path: repo_path.clone(),
            worktree_path: worktree.path().to_path_buf(),
            armed: true,
        };
        Self {
            repo_path,
            guard,
            worktree,
        }
    }

    /// The invoking repository
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// The scratch worktree
    pub fn worktree_path(&self) -> &Path {
        self.worktree.path()
    }

    /// Resolve a path relative to the worktree root
    pub fn in_worktree(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.worktree.path().join(relative)
    }

    /// Called once the async teardown has removed the worktree
    pub(super) fn disarm(&mut self) {
        self.guard.armed = false;
    }
}

/// RAII guard for worktree cleanup.
///
/// Removes the worktree when dropped unless the async teardown already did,
/// which covers panics and early returns. Uses a bounded wait so a hung git
/// process cannot block the drop forever.
#[derive(Debug)]
struct WorktreeGuard {
    git: PathBuf,
    repo_path: PathBuf,
    worktree_path: PathBuf,
    armed: bool,
}

impl Drop for WorktreeGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut child = match std::process::Command::new(&self.git)
            .arg("worktree")
            .arg("remove")
            .arg("--force")
            .arg(&self.worktree_path)
            .current_dir(&self.repo_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                log::warn!(
                    "Could not spawn git to remove worktree {}: {}",
                    self.worktree_path.display(),
                    e
                );
                return;
            }
        };

        let timeout = Duration::from_secs(10);
        match child.wait_timeout(timeout) {
            Ok(Some(status)) if !status.success() => {
                log::warn!(
                    "Failed to remove worktree {} (exit code: {})",
                    self.worktree_path.display(),
                    status.code().unwrap_or(-1)
                );
            }
            Ok(Some(_)) => {
                log::info!("Removed worktree {}", self.worktree_path.display());
            }
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                log::warn!(
                    "Timed out removing worktree {} after {} seconds",
                    self.worktree_path.display(),
                    timeout.as_secs()
                );
            }
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}
