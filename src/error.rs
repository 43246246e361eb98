//! Error types for chart submission scenarios.
//!
//! Failures fall into three categories that must never be conflated:
//! setup/infrastructure failures, assertion verdicts, and polling timeouts.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for scenario operations
pub type Result<T> = std::result::Result<T, E2eError>;

/// Main error type for all scenario operations
#[derive(Error, Debug)]
pub enum E2eError {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Git operation errors
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// GitHub API errors
    #[error("GitHub error: {0}")]
    GitHub(#[from] GitHubError),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Fixture errors
    #[error("Fixture error: {0}")]
    Fixture(#[from] FixtureError),

    /// Scenario context errors
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// Scenario verdict: the policy under test did not behave as expected
    #[error("Assertion failed: {0}")]
    Assertion(#[from] AssertionError),

    /// A bounded wait elapsed without reaching a terminal state
    #[error(
        "Timed out waiting for {operation} after {attempts} attempt(s) over {:.1}s (last state: {last_state})",
        .waited.as_secs_f64()
    )]
    Timeout {
        /// Operation that was being waited on
        operation: String,
        /// Total time spent waiting
        waited: Duration,
        /// Number of polls performed
        attempts: u32,
        /// Last observed non-terminal state
        last_state: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Broad classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// Infrastructure broke; says nothing about the policy under test
    Setup,
    /// The policy under test produced the wrong verdict
    Assertion,
    /// The CI run never reached a terminal state in time
    Timeout,
}

impl FailureCategory {
    /// Process exit code reported for this category
    pub fn exit_code(self) -> i32 {
        match self {
            FailureCategory::Assertion => 1,
            FailureCategory::Setup => 2,
            FailureCategory::Timeout => 3,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is missing
    #[error("{variable} environment variable not defined")]
    MissingVariable {
        /// Variable name
        variable: String,
    },

    /// Only one half of the bot credentials was provided
    #[error("{present} is set but {missing} is not")]
    IncompleteCredentials {
        /// Variable that was set
        present: String,
        /// Variable that was missing
        missing: String,
    },

    /// Variable has a value that cannot be used
    #[error("Invalid value for {variable}: {reason}")]
    InvalidValue {
        /// Variable name
        variable: String,
        /// Reason for the error
        reason: String,
    },
}

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    /// git binary could not be located
    #[error("git executable not found: {reason}")]
    GitNotFound {
        /// Reason for the error
        reason: String,
    },

    /// Not a git repository
    #[error("Not a git repository: {path}")]
    NotRepository {
        /// Path that was inspected
        path: PathBuf,
    },

    /// A git command exited unsuccessfully
    #[error("`{command}` failed: {stderr}")]
    CommandFailed {
        /// Redacted command line
        command: String,
        /// Redacted stderr output
        stderr: String,
    },

    /// Push was rejected by the remote
    #[error("Git push of {refspec} failed: {reason}")]
    PushFailed {
        /// Refspec being pushed
        refspec: String,
        /// Reason for the error
        reason: String,
    },

    /// HEAD is detached where a named branch is required
    #[error("HEAD is detached in {path}; a named branch is required")]
    DetachedHead {
        /// Repository path
        path: PathBuf,
    },

    /// Branch name would not form a valid ref
    #[error("Invalid branch name '{name}': {reason}")]
    InvalidBranchName {
        /// Offending name
        name: String,
        /// Reason for the error
        reason: String,
    },

    /// Workflow driver asked to move to a state it cannot reach
    #[error("Invalid git workflow transition from {from} to {to}")]
    InvalidTransition {
        /// Current phase
        from: String,
        /// Requested phase
        to: String,
    },
}

/// GitHub API errors
#[derive(Error, Debug)]
pub enum GitHubError {
    /// Request could not be sent or the response could not be read
    #[error("{method} {path}: transport failure: {reason}")]
    Transport {
        /// HTTP method
        method: String,
        /// API path
        path: String,
        /// Reason for the error
        reason: String,
    },

    /// Response body did not match the expected shape
    #[error("{path}: unexpected response shape: {reason}")]
    UnexpectedShape {
        /// API path
        path: String,
        /// Reason for the error
        reason: String,
    },

    /// Response status was not one the caller can interpret
    #[error("{method} {path}: unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP method
        method: String,
        /// API path
        path: String,
        /// Status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// API base URL is malformed
    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// Configured URL
        url: String,
        /// Reason for the error
        reason: String,
    },
}

impl GitHubError {
    /// Whether the error may go away on a later poll
    pub fn is_transient(&self) -> bool {
        match self {
            GitHubError::Transport { .. } => true,
            GitHubError::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Template rendering errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Placeholder has no corresponding field
    #[error("No value for placeholder '${{{placeholder}}}'")]
    MissingField {
        /// Placeholder name
        placeholder: String,
    },

    /// `$` not followed by `$`, an identifier, or `{identifier}`
    #[error("Invalid placeholder at byte {offset}")]
    InvalidPlaceholder {
        /// Byte offset of the `$`
        offset: usize,
    },
}

/// Fixture errors
#[derive(Error, Debug)]
pub enum FixtureError {
    /// Fixture file is missing
    #[error("Fixture not found: {path}")]
    NotFound {
        /// Expected path
        path: PathBuf,
    },

    /// Fixture content is malformed
    #[error("Malformed fixture {path}: {reason}")]
    Malformed {
        /// Fixture path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Rendered OWNERS document would authorize the submitting vendor
    #[error("OWNERS document authorizes '{vendor}'; the scenario requires an unauthorized vendor")]
    VendorAuthorized {
        /// Vendor label
        vendor: String,
    },

    /// Feature file could not be understood
    #[error("Feature file {path} line {line}: {reason}")]
    Feature {
        /// Feature file path
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Reason for the error
        reason: String,
    },
}

/// Scenario context errors
#[derive(Error, Debug)]
pub enum ContextError {
    /// A step needed the PR number before the PR was created
    #[error("Pull request number is unset; the pull request step has not succeeded")]
    PrNumberUnset,

    /// A step needed a value an earlier step should have set
    #[error("Context field '{field}' is unset; step '{step}' requires it")]
    FieldUnset {
        /// Field name
        field: String,
        /// Step name
        step: String,
    },
}

/// Scenario verdicts
#[derive(Error, Debug)]
pub enum AssertionError {
    /// CI run concluded with something other than `failure`
    #[error("Workflow run {run_id} concluded '{conclusion}', expected 'failure'")]
    UnexpectedConclusion {
        /// Workflow run id
        run_id: u64,
        /// Observed conclusion
        conclusion: String,
    },

    /// Pull request was merged
    #[error("Pull request #{pr_number} was merged")]
    PullRequestMerged {
        /// Pull request number
        pr_number: u64,
    },

    /// No comment was posted on the pull request
    #[error("Pull request #{pr_number} has no comments")]
    NoComments {
        /// Pull request number
        pr_number: u64,
    },

    /// First comment lacks the expected guidance
    #[error("Expected '{expected}' in the comment: {comment}")]
    MessageMissing {
        /// Expected substring
        expected: String,
        /// Full comment body
        comment: String,
    },
}

impl E2eError {
    /// Classify this error
    pub fn category(&self) -> FailureCategory {
        match self {
            E2eError::Assertion(_) => FailureCategory::Assertion,
            E2eError::Timeout { .. } => FailureCategory::Timeout,
            _ => FailureCategory::Setup,
        }
    }

    /// Shorthand for a timeout error
    pub fn timeout(
        operation: impl Into<String>,
        waited: Duration,
        attempts: u32,
        last_state: impl Into<String>,
    ) -> Self {
        E2eError::Timeout {
            operation: operation.into(),
            waited,
            attempts,
            last_state: last_state.into(),
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            E2eError::Config(ConfigError::MissingVariable { .. })
            | E2eError::Config(ConfigError::IncompleteCredentials { .. }) => vec![
                "Export BOT_NAME and BOT_TOKEN for the bot account".to_string(),
                "Or export GITHUB_TOKEN to run as github-actions[bot]".to_string(),
            ],
            E2eError::Git(GitError::GitNotFound { .. }) => {
                vec!["Install git and make sure it is on PATH".to_string()]
            }
            E2eError::Git(GitError::PushFailed { .. }) => vec![
                "Verify the bot token has write access to the test repository".to_string(),
                "Check that TEST_REPO names an existing repository".to_string(),
            ],
            E2eError::Git(GitError::DetachedHead { .. }) => vec![
                "Check out a named branch, or set GITHUB_ACTIONS to branch from the detached HEAD"
                    .to_string(),
            ],
            E2eError::Fixture(_) | E2eError::Template(_) => vec![
                "Check tests/data/report.yaml and the OWNERS template placeholders".to_string(),
            ],
            E2eError::Timeout { .. } => vec![
                "Check the Actions tab of the test repository for a stuck or queued run"
                    .to_string(),
                "Raise E2E_POLL_TIMEOUT_SECS if the runners are busy".to_string(),
            ],
            E2eError::Assertion(_) => vec![
                "The pull request automation accepted an unauthorized submission; inspect the run logs"
                    .to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_distinct() {
        let assertion = E2eError::from(AssertionError::PullRequestMerged { pr_number: 7 });
        let timeout = E2eError::timeout("run 1", Duration::from_secs(3), 2, "in_progress");
        let setup = E2eError::from(ContextError::PrNumberUnset);

        assert_eq!(assertion.category(), FailureCategory::Assertion);
        assert_eq!(timeout.category(), FailureCategory::Timeout);
        assert_eq!(setup.category(), FailureCategory::Setup);
    }

    #[test]
    fn test_exit_codes_differ_per_category() {
        assert_eq!(FailureCategory::Assertion.exit_code(), 1);
        assert_eq!(FailureCategory::Setup.exit_code(), 2);
        assert_eq!(FailureCategory::Timeout.exit_code(), 3);
    }

    #[test]
    fn test_timeout_message_mentions_last_state() {
        let err = E2eError::timeout("workflow run 42", Duration::from_secs(10), 5, "queued");
        let text = err.to_string();
        assert!(text.contains("workflow run 42"));
        assert!(text.contains("queued"));
        assert!(text.contains("5 attempt(s)"));
    }

    #[test]
    fn test_missing_field_message() {
        let err = TemplateError::MissingField {
            placeholder: "vendor".to_string(),
        };
        assert_eq!(err.to_string(), "No value for placeholder '${vendor}'");
    }

    #[test]
    fn test_transient_github_errors() {
        let transport = GitHubError::Transport {
            method: "GET".into(),
            path: "repos/a/b".into(),
            reason: "reset".into(),
        };
        let server = GitHubError::UnexpectedStatus {
            method: "GET".into(),
            path: "repos/a/b".into(),
            status: 502,
            body: String::new(),
        };
        let shape = GitHubError::UnexpectedShape {
            path: "repos/a/b".into(),
            reason: "missing field".into(),
        };
        assert!(transport.is_transient());
        assert!(server.is_transient());
        assert!(!shape.is_transient());
    }
}
