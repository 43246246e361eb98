//! Bounded polling for the CI verdict on a pull request.
//!
//! Every wait here has a finite bound. Running out of time yields
//! [`E2eError::Timeout`] carrying the last state seen, which callers can tell
//! apart from a run that concluded `failure`.

use crate::config::PollConfig;
use crate::error::{E2eError, Result};
use crate::github::{PullRequestApi, WorkflowRun};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Terminal state of a workflow run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conclusion {
    /// `success`
    Success,
    /// `failure`
    Failure,
    /// `cancelled`
    Cancelled,
    /// `skipped`
    Skipped,
    /// `timed_out`
    TimedOut,
    /// `action_required`
    ActionRequired,
    /// `neutral`
    Neutral,
    /// `stale`
    Stale,
    /// `startup_failure`
    StartupFailure,
    /// Anything the platform adds later
    Other(String),
}

impl Conclusion {
    /// Wire name of the conclusion
    pub fn as_str(&self) -> &str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
            Conclusion::Cancelled => "cancelled",
            Conclusion::Skipped => "skipped",
            Conclusion::TimedOut => "timed_out",
            Conclusion::ActionRequired => "action_required",
            Conclusion::Neutral => "neutral",
            Conclusion::Stale => "stale",
            Conclusion::StartupFailure => "startup_failure",
            Conclusion::Other(s) => s,
        }
    }
}

impl From<&str> for Conclusion {
    fn from(s: &str) -> Self {
        match s {
            "success" => Conclusion::Success,
            "failure" => Conclusion::Failure,
            "cancelled" => Conclusion::Cancelled,
            "skipped" => Conclusion::Skipped,
            "timed_out" => Conclusion::TimedOut,
            "action_required" => Conclusion::ActionRequired,
            "neutral" => Conclusion::Neutral,
            "stale" => Conclusion::Stale,
            "startup_failure" => Conclusion::StartupFailure,
            other => Conclusion::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The run that judged the pull request, and its verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Workflow run id
    pub run_id: u64,
    /// Terminal conclusion
    pub conclusion: Conclusion,
}

/// Result of one probe
enum Probe<T> {
    Ready(T),
    Pending(String),
}

/// Call `probe` every `interval` until it is ready or `bound` elapses.
///
/// Transient API errors count as a pending state; any other error aborts.
async fn poll_until<T, F, Fut>(
    operation: &str,
    interval: Duration,
    bound: Duration,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let last_state = match probe().await {
            Ok(Probe::Ready(value)) => return Ok(value),
            Ok(Probe::Pending(state)) => {
                log::debug!("{operation}: attempt {attempts}: {state}");
                state
            }
            Err(E2eError::GitHub(e)) if e.is_transient() => {
                log::warn!("{operation}: attempt {attempts} failed, retrying: {e}");
                e.to_string()
            }
            Err(e) => return Err(e),
        };

        let waited = started.elapsed();
        if waited + interval > bound {
            return Err(E2eError::timeout(operation, waited, attempts, last_state));
        }
        tokio::time::sleep(interval).await;
    }
}

/// Wait until the pull request reports a head commit
pub async fn await_pull_request_head<A: PullRequestApi>(
    api: &A,
    repo: &str,
    pr_number: u64,
    config: &PollConfig,
) -> Result<String> {
    poll_until(
        &format!("head commit of pull request #{pr_number}"),
        config.lookup_interval,
        config.lookup_timeout,
        move || async move {
            let pr = api.get_pull_request(repo, pr_number).await?;
            Ok(if pr.head.sha.is_empty() {
                Probe::Pending("head sha not reported".to_string())
            } else {
                Probe::Ready(pr.head.sha)
            })
        },
    )
    .await
}

/// Newest run of `workflow` among `runs` for `head_sha`
fn select_run<'a>(runs: &'a [WorkflowRun], head_sha: &str, workflow: &str) -> Option<&'a WorkflowRun> {
    runs.iter()
        .filter(|r| r.head_sha == head_sha && r.name.as_deref() == Some(workflow))
        .max_by_key(|r| (r.created_at, r.id))
}

/// Wait until a run of `workflow` exists for `head_sha`.
///
/// Runs are queued asynchronously after the PR opens, so discovery shares
/// the conclusion bound rather than the short lookup bound.
pub async fn find_run<A: PullRequestApi>(
    api: &A,
    repo: &str,
    head_sha: &str,
    workflow: &str,
    config: &PollConfig,
) -> Result<u64> {
    poll_until(
        &format!("'{workflow}' run for {head_sha}"),
        config.lookup_interval,
        config.conclusion_timeout,
        move || async move {
            let runs = api.workflow_runs_for_sha(repo, head_sha).await?;
            Ok(match select_run(&runs, head_sha, workflow) {
                Some(run) => {
                    log::info!("Workflow run ID: {}", run.id);
                    Probe::Ready(run.id)
                }
                None => Probe::Pending(format!("{} run(s) seen, none named '{workflow}'", runs.len())),
            })
        },
    )
    .await
}

/// Wait until the run reports a conclusion
pub async fn await_conclusion<A: PullRequestApi>(
    api: &A,
    repo: &str,
    run_id: u64,
    config: &PollConfig,
) -> Result<Conclusion> {
    poll_until(
        &format!("conclusion of workflow run {run_id}"),
        config.conclusion_interval,
        config.conclusion_timeout,
        move || async move {
            let run = api.get_workflow_run(repo, run_id).await?;
            Ok(match run.conclusion {
                Some(c) if !c.is_empty() => Probe::Ready(Conclusion::from(c.as_str())),
                _ => Probe::Pending(format!(
                    "status '{}'",
                    run.status.as_deref().unwrap_or("unknown")
                )),
            })
        },
    )
    .await
}

/// Resolve the CI verdict for a pull request
pub async fn await_pr_conclusion<A: PullRequestApi>(
    api: &A,
    repo: &str,
    pr_number: u64,
    workflow: &str,
    config: &PollConfig,
) -> Result<RunOutcome> {
    let head_sha = await_pull_request_head(api, repo, pr_number, config).await?;
    let run_id = find_run(api, repo, &head_sha, workflow, config).await?;
    let conclusion = await_conclusion(api, repo, run_id, config).await?;
    log::info!("Workflow run {run_id} concluded '{conclusion}'");
    Ok(RunOutcome { run_id, conclusion })
}
