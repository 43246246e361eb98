//! State threaded through the scenario steps of one run.

use crate::config::{BotCredentials, SuiteConfig};
use crate::error::{ContextError, Result};
use crate::poller::RunOutcome;
use crate::submission::ChartReport;
use std::path::PathBuf;

/// One run's mutable record, created once and passed to every step
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    /// `owner/name` of the repository under test
    pub test_repo: String,
    /// Credentials for git and API operations
    pub bot: BotCredentials,
    /// Run base name until the branch step namespaces it
    pub base_branch: String,
    /// PR head branch, set by the branch step
    pub pr_branch: Option<String>,
    pr_number: Option<u64>,
    /// Set by the OWNERS step
    pub vendor_type: String,
    /// Generated vendor label, set by the OWNERS step
    pub vendor: String,
    /// Rendered OWNERS document, set by the OWNERS step
    pub owners_file_content: Option<String>,
    /// From the report fixture
    pub chart_name: String,
    /// From the report fixture
    pub chart_version: semver::Version,
    /// Chart archive fixture
    pub test_chart: PathBuf,
    /// Report fixture
    pub test_report: PathBuf,
    /// Parsed report fixture
    pub report: ChartReport,
    /// CI verdict, once polled
    pub run_outcome: Option<RunOutcome>,
}

impl SubmissionContext {
    /// Fresh context for a run branching from `base_branch`
    pub fn new(
        config: &SuiteConfig,
        base_branch: impl Into<String>,
        test_chart: PathBuf,
        report: ChartReport,
    ) -> Self {
        Self {
            test_repo: config.test_repo.clone(),
            bot: config.bot.clone(),
            base_branch: base_branch.into(),
            pr_branch: None,
            pr_number: None,
            vendor_type: String::new(),
            vendor: String::new(),
            owners_file_content: None,
            chart_name: report.chart_name.clone(),
            chart_version: report.chart_version.clone(),
            test_chart,
            test_report: report.path.clone(),
            report,
            run_outcome: None,
        }
    }

    /// The pull request number; fails until the PR step has succeeded
    pub fn pr_number(&self) -> Result<u64> {
        self.pr_number.ok_or_else(|| ContextError::PrNumberUnset.into())
    }

    /// Record the created pull request
    pub fn set_pr_number(&mut self, number: u64) {
        self.pr_number = Some(number);
    }

    /// PR head branch, or an error naming the step that needs it
    pub fn pr_branch(&self, step: &str) -> Result<&str> {
        self.pr_branch
            .as_deref()
            .ok_or_else(|| unset("pr_branch", step))
    }

    /// Rendered OWNERS document, or an error naming the step that needs it
    pub fn owners_file_content(&self, step: &str) -> Result<&str> {
        self.owners_file_content
            .as_deref()
            .ok_or_else(|| unset("owners_file_content", step))
    }
}

fn unset(field: &str, step: &str) -> crate::error::E2eError {
    ContextError::FieldUnset {
        field: field.to_string(),
        step: step.to_string(),
    }
    .into()
}

/// Context for unit tests, as a run from `main` would start it
#[cfg(test)]
pub(crate) fn sample_context() -> SubmissionContext {
    let config = SuiteConfig::from_lookup(|key| match key {
        "BOT_NAME" => Some("helm-bot".to_string()),
        "BOT_TOKEN" => Some("t0ken".to_string()),
        "TEST_REPO" => Some("acme/sandbox".to_string()),
        _ => None,
    })
    .unwrap();
    let report = ChartReport::parse(
        std::path::Path::new("tests/data/report.yaml"),
        "metadata:\n  chart:\n    name: vault\n    version: 0.13.0\n".to_string(),
    )
    .unwrap();
    SubmissionContext::new(
        &config,
        "unauthorized-user-main",
        PathBuf::from("tests/data/vault-0.13.0.tgz"),
        report,
    )
}
