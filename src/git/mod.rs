//! Git operations for staging chart submissions.
//!
//! All work happens in a detached worktree created from the invoking
//! repository's HEAD; the invoker's own checkout stays untouched.

mod cli;
mod operations;
mod workflow;
mod workspace;

pub use cli::{GitCli, GitOutput};
pub use operations::{CommitIdentity, GitOperations};
pub use workflow::{GitWorkflow, WorkflowPhase};
pub use workspace::{WORKTREE_PREFIX, Workspace};
