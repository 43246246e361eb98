//! Drives one Examples row from run-context preparation to teardown.
//!
//! Teardown runs after the steps on every path, including a step error or
//! a panic. Its own failures are collected as warnings and never replace
//! the outcome of the steps.

use super::context::SubmissionContext;
use super::feature::ScenarioExample;
use super::steps::{RunResources, Step, StepEnv};
use crate::branch::{BranchScope, run_base_name};
use crate::config::{GITHUB_ACTIONS_BOT_EMAIL, SuiteConfig};
use crate::error::{E2eError, FailureCategory, GitError, Result};
use crate::git::{CommitIdentity, GitCli, GitOperations, GitWorkflow};
use crate::github::{PullRequestApi, RefDeletion};
use crate::submission::ChartReport;
use futures_lite::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

/// Result of running one example
#[derive(Debug)]
pub struct ScenarioReport {
    /// The example that ran
    pub example: ScenarioExample,
    /// `Ok` when every step passed
    pub outcome: Result<()>,
    /// Steps that completed, in order
    pub steps_completed: Vec<Step>,
    /// Problems hit while tearing down
    pub teardown_warnings: Vec<String>,
}

impl ScenarioReport {
    /// Whether every step passed
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Failure category, if the run failed
    pub fn failure_category(&self) -> Option<FailureCategory> {
        self.outcome.as_ref().err().map(E2eError::category)
    }
}

/// Runs scenario examples against one repository
#[derive(Debug)]
pub struct ScenarioRunner<A> {
    api: A,
    config: SuiteConfig,
    repo_path: PathBuf,
    push_url: Option<String>,
}

impl<A: PullRequestApi> ScenarioRunner<A> {
    /// `repo_path` is the invoking repository the fixtures live in
    pub fn new(api: A, config: SuiteConfig, repo_path: PathBuf) -> Self {
        Self {
            api,
            config,
            repo_path,
            push_url: None,
        }
    }

    #[cfg(test)]
    fn with_push_url(mut self, url: impl Into<String>) -> Self {
        self.push_url = Some(url.into());
        self
    }

    fn workflow(&self) -> Result<GitWorkflow> {
        let git = GitCli::new(vec![self.config.bot.token.clone()])?;
        let identity = CommitIdentity {
            name: self.config.bot.name.clone(),
            email: GITHUB_ACTIONS_BOT_EMAIL.to_string(),
        };
        let push_url = match &self.push_url {
            Some(url) => url.clone(),
            None => self.config.authenticated_remote_url()?,
        };
        Ok(GitWorkflow::new(git, push_url, identity))
    }

    /// Run one example. Never returns early past resource acquisition.
    pub async fn run(&self, example: &ScenarioExample) -> ScenarioReport {
        log::info!(
            "Scenario: vendor '{}' of type '{}'",
            example.vendor,
            example.vendor_type
        );

        let mut workflow = match self.workflow() {
            Ok(workflow) => workflow,
            Err(e) => {
                return ScenarioReport {
                    example: example.clone(),
                    outcome: Err(e),
                    steps_completed: Vec::new(),
                    teardown_warnings: Vec::new(),
                };
            }
        };

        let mut resources = RunResources::new(self.repo_path.clone());
        let mut steps_completed = Vec::new();

        let body = self.drive(example, &mut workflow, &mut resources, &mut steps_completed);
        let outcome = match AssertUnwindSafe(body).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(anyhow::anyhow!("scenario panicked: {message}").into())
            }
        };

        match &outcome {
            Ok(()) => log::info!("Scenario passed"),
            Err(e) => log::error!("Scenario failed: {e}"),
        }

        let teardown_warnings = self.teardown(&mut workflow, resources).await;

        ScenarioReport {
            example: example.clone(),
            outcome,
            steps_completed,
            teardown_warnings,
        }
    }

    async fn drive(
        &self,
        example: &ScenarioExample,
        workflow: &mut GitWorkflow,
        resources: &mut RunResources,
        steps_completed: &mut Vec<Step>,
    ) -> Result<()> {
        let base = self.prepare_run_context(workflow, resources).await?;

        let report = ChartReport::load(&self.repo_path.join(&self.config.test_report))?;
        let mut ctx = SubmissionContext::new(
            &self.config,
            base,
            self.repo_path.join(&self.config.test_chart),
            report,
        );

        let mut env = StepEnv {
            api: &self.api,
            config: &self.config,
            example,
            workflow,
            resources,
        };
        for step in Step::ALL {
            log::info!("Step: {step}");
            step.execute(&mut ctx, &mut env).await?;
            steps_completed.push(step);
        }
        Ok(())
    }

    /// Publish the invoking HEAD to the test repository and return the run
    /// base name derived from the current branch
    async fn prepare_run_context(
        &self,
        workflow: &GitWorkflow,
        resources: &mut RunResources,
    ) -> Result<String> {
        let repo = resources.repo_path.clone();
        let git = workflow.git();

        if self.config.github_actions {
            // CI checks out a detached HEAD; give it a branch named after the commit.
            let head_sha = git.short_head(&repo).await?;
            if !git.local_branches(&repo).await?.contains(&head_sha) {
                git.checkout_new_branch(&repo, &head_sha).await?;
            }
            resources.ledger.record(BranchScope::Remote, head_sha);
        }

        let current = git
            .current_branch(&repo)
            .await?
            .ok_or_else(|| GitError::DetachedHead { path: repo.clone() })?;

        let remote_branches = self.api.list_branch_names(&self.config.test_repo).await?;
        if !remote_branches.contains(&current) {
            log::info!(
                "{}:{} does not exist, creating with local branch",
                self.config.test_repo,
                current
            );
        }
        workflow.publish_head(&repo, &current).await?;

        Ok(run_base_name(&current))
    }

    async fn teardown(&self, workflow: &mut GitWorkflow, resources: RunResources) -> Vec<String> {
        let RunResources {
            repo_path,
            workspace,
            ledger,
        } = resources;

        let local = ledger.teardown_order(BranchScope::Local);
        let mut warnings = workflow.teardown(&repo_path, workspace, &local).await;

        for branch in ledger.teardown_order(BranchScope::Remote) {
            log::info!("Delete '{}:{}'", self.config.test_repo, branch);
            match self.api.delete_branch(&self.config.test_repo, &branch).await {
                Ok(RefDeletion::Deleted) => {}
                Ok(RefDeletion::AlreadyGone) => {
                    log::debug!("Remote branch '{branch}' was never pushed");
                }
                Err(e) => warnings.push(format!("delete remote branch '{branch}': {e}")),
            }
        }

        for warning in &warnings {
            log::warn!("Teardown: {warning}");
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollConfig;
    use crate::github::fake::{FakeApi, pull_request, workflow_run};
    use std::path::Path;
    use std::process::Command;
    use std::time::Duration;

    fn config() -> SuiteConfig {
        SuiteConfig::from_lookup(|key| match key {
            "BOT_NAME" => Some("helm-bot".to_string()),
            "BOT_TOKEN" => Some("t0ken".to_string()),
            "TEST_REPO" => Some("acme/sandbox".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_setup_failure_still_tears_down() {
        if which::which("git").is_err() {
            return;
        }
        // Not a repository: preparation fails before anything is pushed.
        let dir = tempfile::tempdir().unwrap();
        let api = FakeApi::default();
        let runner = ScenarioRunner::new(api, config(), dir.path().to_path_buf());
        let example = ScenarioExample {
            vendor_type: "partner".to_string(),
            vendor: "hashicorp".to_string(),
            message: "is not allowed".to_string(),
        };

        let report = runner.run(&example).await;

        assert!(!report.passed());
        assert_eq!(report.failure_category(), Some(FailureCategory::Setup));
        assert!(report.steps_completed.is_empty());
        assert!(runner.api.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_ledger_branches_are_deleted_newest_first() {
        let Ok(git) = GitCli::new(Vec::new()) else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let runner = ScenarioRunner::new(FakeApi::default(), config(), dir.path().to_path_buf());
        let mut workflow = GitWorkflow::new(
            git,
            "file:///nowhere".to_string(),
            CommitIdentity {
                name: "bot".into(),
                email: "bot@example.com".into(),
            },
        );
        let mut resources = RunResources::new(dir.path().to_path_buf());
        resources.ledger.record(BranchScope::Remote, "abc1234");
        resources.ledger.record(BranchScope::Remote, "partner-x-base");
        resources.ledger.record(BranchScope::Remote, "partner-x-base-pr");

        // `git worktree prune` fails outside a repository; that is a warning.
        let warnings = runner.teardown(&mut workflow, resources).await;

        assert!(!warnings.is_empty());
        assert_eq!(
            *runner.api.deleted.lock().unwrap(),
            vec!["partner-x-base-pr", "partner-x-base", "abc1234"]
        );
    }

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(["-c", "user.name=fixture", "-c", "user.email=fixture@example.com"])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Repository on `main` with the fixtures committed, and a bare remote
    fn local_repo() -> Option<(tempfile::TempDir, PathBuf, PathBuf)> {
        which::which("git").ok()?;
        let root = tempfile::tempdir().unwrap();
        git(root.path(), &["init", "-q", "--bare", "remote.git"]);

        let repo = root.path().join("repo");
        std::fs::create_dir_all(repo.join("tests/data")).unwrap();
        git(&repo, &["init", "-q"]);
        git(&repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&repo, &["config", "commit.gpgsign", "false"]);
        let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data");
        for name in ["report.yaml", "vault-0.13.0.tgz"] {
            std::fs::copy(data.join(name), repo.join("tests/data").join(name)).unwrap();
        }
        git(&repo, &["add", "-A", "-f"]);
        git(&repo, &["commit", "-q", "-m", "init"]);

        let remote = root.path().join("remote.git");
        Some((root, repo, remote))
    }

    fn scripted_api(conclusion: &str) -> FakeApi {
        let api = FakeApi::default();
        api.branches.push(Ok(Vec::new()));
        api.pull_requests.push(Ok(pull_request(11, "abc", "pr")));
        api.runs_for_sha
            .push(Ok(vec![workflow_run(3, "CI", "abc", "completed", Some(conclusion))]));
        api.run
            .push(Ok(workflow_run(3, "CI", "abc", "completed", Some(conclusion))));
        api
    }

    fn local_runner(api: FakeApi, repo: &Path, remote: &Path) -> ScenarioRunner<FakeApi> {
        let mut config = config();
        config.poll = PollConfig {
            lookup_interval: Duration::from_millis(2),
            lookup_timeout: Duration::from_secs(5),
            conclusion_interval: Duration::from_millis(2),
            conclusion_timeout: Duration::from_secs(5),
        };
        ScenarioRunner::new(api, config, repo.to_path_buf())
            .with_push_url(remote.to_str().unwrap())
    }

    fn example() -> ScenarioExample {
        ScenarioExample {
            vendor_type: "partner".to_string(),
            vendor: "hashicorp".to_string(),
            message: "is not allowed".to_string(),
        }
    }

    /// Worktree, local base branch, and remote branches are all released
    fn assert_released(runner: &ScenarioRunner<FakeApi>, repo: &Path, report: &ScenarioReport) {
        assert!(report.teardown_warnings.is_empty(), "{:?}", report.teardown_warnings);

        let created = runner.api.created.lock().unwrap();
        let (pr, base) = (created[0].head.clone(), created[0].base.clone());
        assert_eq!(pr, format!("{base}-pr"));
        assert_eq!(*runner.api.deleted.lock().unwrap(), vec![pr, base.clone()]);

        assert!(git(repo, &["branch", "--list", &base]).is_empty());
        let worktrees = git(repo, &["worktree", "list", "--porcelain"]);
        assert_eq!(
            worktrees.lines().filter(|l| l.starts_with("worktree ")).count(),
            1,
            "{worktrees}"
        );
    }

    #[tokio::test]
    async fn test_failed_assertion_releases_everything_acquired() {
        let Some((_root, repo, remote)) = local_repo() else {
            return;
        };
        let runner = local_runner(scripted_api("success"), &repo, &remote);

        let report = runner.run(&example()).await;

        assert_eq!(report.failure_category(), Some(FailureCategory::Assertion));
        assert_eq!(
            report.steps_completed,
            vec![Step::VendorNotInOwners, Step::CreateBranch, Step::OpenPullRequest]
        );
        assert_released(&runner, &repo, &report);
        assert_eq!(git(&repo, &["rev-parse", "--abbrev-ref", "HEAD"]), "main");
    }

    #[tokio::test]
    async fn test_panicking_step_still_tears_down() {
        let Some((_root, repo, remote)) = local_repo() else {
            return;
        };
        // No merge status is scripted, so the fake panics once CI concludes.
        let runner = local_runner(scripted_api("failure"), &repo, &remote);

        let report = runner.run(&example()).await;

        assert_eq!(report.failure_category(), Some(FailureCategory::Setup));
        let message = report.outcome.as_ref().unwrap_err().to_string();
        assert!(message.contains("panicked"), "{message}");
        assert!(!report.steps_completed.contains(&Step::PullRequestNotMerged));
        assert_released(&runner, &repo, &report);
    }
}
