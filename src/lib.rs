//! # Chart OWNERS functional test
//!
//! End-to-end check that the chart repository's pull request automation
//! rejects a chart submitted by a vendor that no OWNERS file authorizes.
//!
//! ## What a run does
//!
//! - **Vendor**: generates a fresh vendor label and an OWNERS file with an
//!   empty `users` list
//! - **Branches**: stages OWNERS on a namespaced base branch and the chart
//!   plus report on a PR branch, from a detached worktree in a temp dir
//! - **Pull request**: opens the PR and polls the CI run until it concludes
//! - **Verdict**: CI must conclude `failure`, the merge endpoint must answer
//!   404, and the first PR comment must carry the expected guidance
//! - **Teardown**: worktree, local branch, and remote branches are removed
//!   on every exit path
//!
//! ## Usage
//!
//! ```bash
//! BOT_NAME=helm-bot BOT_TOKEN=... TEST_REPO=acme/sandbox chart_owners_e2e
//! chart_owners_e2e --list
//! chart_owners_e2e --example 0 --repo /path/to/charts
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod branch;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod poller;
pub mod scenario;
pub mod submission;
pub mod template;

pub use cli::Args;
pub use config::{PollConfig, SuiteConfig};
pub use error::{E2eError, FailureCategory, Result};
pub use git::{GitOperations, GitWorkflow, Workspace};
pub use github::{GitHubClient, PullRequestApi};
pub use poller::{Conclusion, RunOutcome};
pub use scenario::{FeatureFile, ScenarioExample, ScenarioReport, ScenarioRunner, Step};
