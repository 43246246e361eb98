//! The scenario's steps, in the order the narrative states them.

use super::context::SubmissionContext;
use super::feature::ScenarioExample;
use crate::branch::{BranchLedger, BranchNames, BranchScope};
use crate::config::{PollConfig, SuiteConfig};
use crate::error::{AssertionError, Result};
use crate::git::{GitWorkflow, Workspace};
use crate::github::{MergeStatus, NewPullRequest, PullRequestApi};
use crate::poller::{self, Conclusion};
use crate::submission::{ChartLayout, SubmissionBuilder, render_owners, unique_vendor_label};
use std::fmt;
use std::path::PathBuf;

/// A scenario step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Given `<vendor>` of `<vendor_type>` user is not present in the OWNERS file
    VendorNotInOwners,
    /// And the user creates a branch to add a new chart version
    CreateBranch,
    /// When the user sends a pull request with chart and report
    OpenPullRequest,
    /// Then the pull request is not merged
    PullRequestNotMerged,
    /// And user gets the `<message>` in the pull request
    GuidanceCommentPosted,
}

impl Step {
    /// Every step, in execution order
    pub const ALL: [Step; 5] = [
        Step::VendorNotInOwners,
        Step::CreateBranch,
        Step::OpenPullRequest,
        Step::PullRequestNotMerged,
        Step::GuidanceCommentPosted,
    ];

    /// Narrative text of the step
    pub fn description(self) -> &'static str {
        match self {
            Step::VendorNotInOwners => "vendor is not present in the OWNERS file of the chart",
            Step::CreateBranch => "the user creates a branch to add a new chart version",
            Step::OpenPullRequest => "the user sends a pull request with chart and report",
            Step::PullRequestNotMerged => "the pull request is not merged",
            Step::GuidanceCommentPosted => "user gets the message with steps to follow",
        }
    }

    /// Run this step against the context
    pub async fn execute<A: PullRequestApi>(
        self,
        ctx: &mut SubmissionContext,
        env: &mut StepEnv<'_, A>,
    ) -> Result<()> {
        match self {
            Step::VendorNotInOwners => {
                vendor_not_in_owners(ctx, &env.example.vendor, &env.example.vendor_type)
            }
            Step::CreateBranch => {
                create_branch(ctx, env.config, env.workflow, env.resources).await
            }
            Step::OpenPullRequest => {
                open_pull_request(ctx, env.api, env.config.pr_body.as_deref()).await?;
                env.workflow.mark_pr_opened()
            }
            Step::PullRequestNotMerged => {
                pull_request_not_merged(ctx, env.api, &env.config.ci_workflow, &env.config.poll)
                    .await
            }
            Step::GuidanceCommentPosted => {
                guidance_comment_posted(ctx, env.api, &env.example.message).await
            }
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Resources a run acquires; teardown releases all of them
#[derive(Debug)]
pub struct RunResources {
    /// The invoking repository
    pub repo_path: PathBuf,
    /// Scratch worktree, once created
    pub workspace: Option<Workspace>,
    /// Branches created by this run
    pub ledger: BranchLedger,
}

impl RunResources {
    /// Nothing acquired yet
    pub fn new(repo_path: PathBuf) -> Self {
        Self {
            repo_path,
            workspace: None,
            ledger: BranchLedger::new(),
        }
    }
}

/// Everything a step may use besides the context
#[derive(Debug)]
pub struct StepEnv<'a, A> {
    /// Hosting platform
    pub api: &'a A,
    /// Suite configuration
    pub config: &'a SuiteConfig,
    /// Examples row being run
    pub example: &'a ScenarioExample,
    /// Git workflow driver
    pub workflow: &'a mut GitWorkflow,
    /// Acquired resources
    pub resources: &'a mut RunResources,
}

/// Generate a fresh vendor label and an OWNERS document that omits it
pub fn vendor_not_in_owners(
    ctx: &mut SubmissionContext,
    vendor: &str,
    vendor_type: &str,
) -> Result<()> {
    log::info!("Vendor is: {vendor} Vendor Type is: {vendor_type}");
    ctx.vendor_type = vendor_type.to_string();
    ctx.vendor = unique_vendor_label(vendor);
    ctx.owners_file_content = Some(render_owners(&ctx.vendor, &ctx.chart_name)?);
    Ok(())
}

/// Namespace the branches, then stage OWNERS on the base branch and the
/// chart on the PR branch
pub async fn create_branch(
    ctx: &mut SubmissionContext,
    config: &SuiteConfig,
    workflow: &mut GitWorkflow,
    resources: &mut RunResources,
) -> Result<()> {
    let step = Step::CreateBranch.description();
    let owners = ctx.owners_file_content(step)?.to_string();

    let names = BranchNames::allocate(&ctx.base_branch, &ctx.vendor_type, &ctx.vendor)?;
    ctx.base_branch = names.base.clone();
    ctx.pr_branch = Some(names.pr.clone());

    // Record before anything is created so a failed push is still cleaned up.
    resources.ledger.record(BranchScope::Remote, &names.base);
    resources.ledger.record(BranchScope::Remote, &names.pr);
    resources.ledger.record(BranchScope::Local, &names.base);

    if config.workflow_development {
        log::info!("Workflow development enabled");
        workflow
            .checkpoint_local_changes(&resources.repo_path)
            .await?;
    }

    let workspace = workflow
        .create_worktree(&resources.repo_path, &names.base)
        .await?;
    let workspace = resources.workspace.insert(workspace);

    let layout = ChartLayout {
        vendor_type: ctx.vendor_type.clone(),
        vendor: ctx.vendor.clone(),
        chart_name: ctx.chart_name.clone(),
        chart_version: ctx.chart_version.clone(),
    };
    SubmissionBuilder {
        layout: &layout,
        owners_content: &owners,
        report: &ctx.report,
        chart_archive: &ctx.test_chart,
        test_repo: &ctx.test_repo,
        branches: &names,
    }
    .build(workflow, workspace)
    .await?;
    Ok(())
}

/// Open the pull request from the PR branch into the base branch
pub async fn open_pull_request<A: PullRequestApi>(
    ctx: &mut SubmissionContext,
    api: &A,
    body: Option<&str>,
) -> Result<()> {
    let head = ctx.pr_branch(Step::OpenPullRequest.description())?.to_string();
    let request = NewPullRequest {
        title: head.clone(),
        head,
        base: ctx.base_branch.clone(),
        body: body.map(str::to_string),
    };
    let pr = api.create_pull_request(&ctx.test_repo, &request).await?;
    match &pr.html_url {
        Some(url) => log::info!("Opened pull request #{} ({url})", pr.number),
        None => log::info!("Opened pull request #{}", pr.number),
    }
    ctx.set_pr_number(pr.number);
    Ok(())
}

/// CI must conclude `failure` and the merge endpoint must answer 404
pub async fn pull_request_not_merged<A: PullRequestApi>(
    ctx: &mut SubmissionContext,
    api: &A,
    workflow: &str,
    poll: &PollConfig,
) -> Result<()> {
    let pr_number = ctx.pr_number()?;

    let outcome = poller::await_pr_conclusion(api, &ctx.test_repo, pr_number, workflow, poll).await?;
    ctx.run_outcome = Some(outcome.clone());
    if outcome.conclusion != Conclusion::Failure {
        return Err(AssertionError::UnexpectedConclusion {
            run_id: outcome.run_id,
            conclusion: outcome.conclusion.to_string(),
        }
        .into());
    }
    log::info!("Workflow run was 'failure' which is expected");

    match api.pull_merge_status(&ctx.test_repo, pr_number).await? {
        MergeStatus::NotMerged => {
            log::info!("PR not merged, which is expected");
            Ok(())
        }
        MergeStatus::Merged => Err(AssertionError::PullRequestMerged { pr_number }.into()),
    }
}

/// The first comment on the pull request must contain `message`
pub async fn guidance_comment_posted<A: PullRequestApi>(
    ctx: &mut SubmissionContext,
    api: &A,
    message: &str,
) -> Result<()> {
    let pr_number = ctx.pr_number()?;
    let comments = api.issue_comments(&ctx.test_repo, pr_number).await?;
    let first = comments
        .first()
        .ok_or(AssertionError::NoComments { pr_number })?;

    if first.body.contains(message) {
        log::info!("Found the expected comment in the PR");
        Ok(())
    } else {
        Err(AssertionError::MessageMissing {
            expected: message.to_string(),
            comment: first.body.clone(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ContextError, E2eError, FailureCategory};
    use crate::github::fake::{FakeApi, comment, pull_request, workflow_run};
    use crate::scenario::context::sample_context;
    use crate::submission::OwnersFile;
    use std::time::Duration;

    const MESSAGE: &str = "is not allowed to submit the chart on behalf of partner";

    fn fast() -> PollConfig {
        PollConfig {
            lookup_interval: Duration::from_millis(2),
            lookup_timeout: Duration::from_secs(5),
            conclusion_interval: Duration::from_millis(2),
            conclusion_timeout: Duration::from_secs(5),
        }
    }

    fn opened() -> SubmissionContext {
        let mut ctx = sample_context();
        ctx.set_pr_number(7);
        ctx
    }

    fn api_with_conclusion(conclusion: &str, merge: MergeStatus) -> FakeApi {
        let api = FakeApi::default();
        api.pull_requests.push(Ok(pull_request(7, "abc", "b-pr")));
        api.runs_for_sha
            .push(Ok(vec![workflow_run(5, "CI", "abc", "queued", None)]));
        api.run
            .push(Ok(workflow_run(5, "CI", "abc", "in_progress", None)))
            .push(Ok(workflow_run(5, "CI", "abc", "completed", Some(conclusion))));
        api.merge_status.push(Ok(merge));
        api
    }

    #[test]
    fn test_steps_run_in_narrative_order() {
        assert_eq!(Step::ALL[0], Step::VendorNotInOwners);
        assert_eq!(Step::ALL[4], Step::GuidanceCommentPosted);
    }

    #[test]
    fn test_vendor_step_renders_unauthorized_owners() {
        let mut ctx = sample_context();
        vendor_not_in_owners(&mut ctx, "hashicorp", "partner").unwrap();
        assert!(ctx.vendor.starts_with("hashicorp-"));
        assert_eq!(ctx.vendor_type, "partner");
        let owners = OwnersFile::parse(ctx.owners_file_content.as_deref().unwrap()).unwrap();
        assert!(owners.users.is_empty());
        assert!(!owners.authorizes(&ctx.vendor));
    }

    #[tokio::test]
    async fn test_open_pull_request_records_number() {
        let mut ctx = sample_context();
        ctx.base_branch = "partner-acme-1-unauthorized-user-main".to_string();
        ctx.pr_branch = Some("partner-acme-1-unauthorized-user-main-pr".to_string());
        let api = FakeApi::default();
        api.pull_requests.push(Ok(pull_request(31, "abc", "x")));

        open_pull_request(&mut ctx, &api, Some("body")).await.unwrap();

        assert_eq!(ctx.pr_number().unwrap(), 31);
        let created = api.created.lock().unwrap();
        assert_eq!(created[0].head, "partner-acme-1-unauthorized-user-main-pr");
        assert_eq!(created[0].base, "partner-acme-1-unauthorized-user-main");
        assert_eq!(created[0].title, created[0].head);
        assert_eq!(created[0].body.as_deref(), Some("body"));
    }

    #[tokio::test]
    async fn test_open_pull_request_needs_pr_branch() {
        let mut ctx = sample_context();
        let api = FakeApi::default();
        let err = open_pull_request(&mut ctx, &api, None).await.unwrap_err();
        assert!(matches!(
            err,
            E2eError::Context(ContextError::FieldUnset { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_unmerged_pull_request_passes() {
        let mut ctx = opened();
        let api = api_with_conclusion("failure", MergeStatus::NotMerged);
        pull_request_not_merged(&mut ctx, &api, "CI", &fast())
            .await
            .unwrap();
        assert_eq!(ctx.run_outcome.unwrap().run_id, 5);
    }

    #[tokio::test]
    async fn test_successful_run_is_an_assertion_failure() {
        let mut ctx = opened();
        let api = api_with_conclusion("success", MergeStatus::NotMerged);
        let err = pull_request_not_merged(&mut ctx, &api, "CI", &fast())
            .await
            .unwrap_err();
        assert_eq!(err.category(), FailureCategory::Assertion);
        assert!(matches!(
            err,
            E2eError::Assertion(AssertionError::UnexpectedConclusion { run_id: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_merged_pull_request_is_an_assertion_failure() {
        let mut ctx = opened();
        let api = api_with_conclusion("failure", MergeStatus::Merged);
        let err = pull_request_not_merged(&mut ctx, &api, "CI", &fast())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            E2eError::Assertion(AssertionError::PullRequestMerged { pr_number: 7 })
        ));
    }

    #[tokio::test]
    async fn test_steps_after_pr_fail_loudly_without_number() {
        let mut ctx = sample_context();
        let api = FakeApi::default();
        let err = pull_request_not_merged(&mut ctx, &api, "CI", &fast())
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::Context(ContextError::PrNumberUnset)));
        let err = guidance_comment_posted(&mut ctx, &api, MESSAGE)
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::Context(ContextError::PrNumberUnset)));
    }

    #[tokio::test]
    async fn test_first_comment_must_contain_message() {
        let mut ctx = opened();
        let api = FakeApi::default();
        api.comments.push(Ok(vec![
            comment(1, &format!("[ERROR] hashicorp-1a2b {MESSAGE}. Add the vendor to OWNERS.")),
            comment(2, "unrelated"),
        ]));
        guidance_comment_posted(&mut ctx, &api, MESSAGE).await.unwrap();
    }

    #[tokio::test]
    async fn test_message_only_in_later_comment_fails() {
        let mut ctx = opened();
        let api = FakeApi::default();
        api.comments
            .push(Ok(vec![comment(1, "Thanks for the PR"), comment(2, MESSAGE)]));
        let err = guidance_comment_posted(&mut ctx, &api, MESSAGE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            E2eError::Assertion(AssertionError::MessageMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_comments_fails() {
        let mut ctx = opened();
        let api = FakeApi::default();
        api.comments.push(Ok(vec![]));
        let err = guidance_comment_posted(&mut ctx, &api, MESSAGE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            E2eError::Assertion(AssertionError::NoComments { pr_number: 7 })
        ));
    }
}
