//! The unauthorized-submission scenario: context, narrative, steps, runner.

mod context;
mod feature;
mod runner;
mod steps;

pub use context::SubmissionContext;
pub use feature::{FeatureFile, ScenarioExample};
pub use runner::{ScenarioReport, ScenarioRunner};
pub use steps::{
    RunResources, Step, StepEnv, create_branch, guidance_comment_posted, open_pull_request,
    pull_request_not_merged, vendor_not_in_owners,
};
