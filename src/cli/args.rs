//! Command line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Default location of the scenario narrative
pub const DEFAULT_FEATURE: &str = "features/chart_submitted_by_unauthorized_user.feature";

/// Functional test: a chart submitted by a vendor absent from OWNERS must be rejected
#[derive(Parser, Debug, Clone)]
#[command(
    name = "chart_owners_e2e",
    version,
    about = "Functional test: unauthorized chart submissions are rejected",
    long_about = "Stages a chart submission by a freshly generated vendor that no OWNERS file \
authorizes, opens a pull request against the test repository, and checks that CI \
fails, the pull request stays unmerged, and the first comment explains the fix.

Credentials come from BOT_NAME/BOT_TOKEN or GITHUB_TOKEN; the target repository \
from TEST_REPO.

Exit codes: 0 passed, 1 assertion failed, 2 setup failed, 3 timed out."
)]
pub struct Args {
    /// Feature file holding the scenario and its Examples table
    #[arg(long, value_name = "PATH", default_value = DEFAULT_FEATURE)]
    pub feature: PathBuf,

    /// Repository the fixtures live in and the worktree is created from
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub repo: PathBuf,

    /// Run only the Examples row at this 0-based index
    #[arg(long, value_name = "INDEX")]
    pub example: Option<usize>,

    /// Print the Examples rows and exit
    #[arg(long)]
    pub list: bool,

    /// Only print errors and the final verdict
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Resolve the feature path against `--repo` when it is relative
    pub fn feature_path(&self) -> PathBuf {
        if self.feature.is_absolute() {
            self.feature.clone()
        } else {
            self.repo.join(&self.feature)
        }
    }
}
