//! Branch namespace allocation for one scenario run.
//!
//! Names are derived from the run context so reruns in the same CI job are
//! traceable, while the generated vendor label keeps concurrent runs apart.

use crate::error::{GitError, Result};

/// Prefix of the per-run base branch before vendor namespacing
pub const RUN_BRANCH_PREFIX: &str = "unauthorized-user";

/// Suffix distinguishing the PR head branch from its base
pub const PR_BRANCH_SUFFIX: &str = "-pr";

/// Base identifier for a run started from `current_branch`
pub fn run_base_name(current_branch: &str) -> String {
    format!("{RUN_BRANCH_PREFIX}-{current_branch}")
}

/// The pair of branches a scenario pushes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchNames {
    /// Branch holding the OWNERS commit; the PR targets it
    pub base: String,
    /// Branch holding the chart commit; the PR head
    pub pr: String,
}

impl BranchNames {
    /// `base = <vendor_type>-<vendor>-<original_base>`, `pr = <base>-pr`
    pub fn allocate(original_base: &str, vendor_type: &str, vendor: &str) -> Result<Self> {
        for (part, value) in [
            ("base", original_base),
            ("vendor type", vendor_type),
            ("vendor", vendor),
        ] {
            if value.is_empty() {
                return Err(GitError::InvalidBranchName {
                    name: value.to_string(),
                    reason: format!("{part} component is empty"),
                }
                .into());
            }
        }

        let base = format!("{vendor_type}-{vendor}-{original_base}");
        validate_branch_name(&base)?;
        let pr = format!("{base}{PR_BRANCH_SUFFIX}");
        Ok(Self { base, pr })
    }
}

/// Reject names git would refuse as `refs/heads/<name>`
pub fn validate_branch_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.starts_with('-') || name.starts_with('/') {
        Some("name must not start with '-' or '/'")
    } else if name.ends_with('/') || name.ends_with('.') || name.ends_with(".lock") {
        Some("name must not end with '/', '.' or '.lock'")
    } else if name.contains("..") || name.contains("//") || name.contains("@{") {
        Some("name contains '..', '//' or '@{'")
    } else if name
        .chars()
        .any(|c| c.is_ascii_control() || c.is_whitespace() || "~^:?*[\\".contains(c))
    {
        Some("name contains whitespace, control or special characters")
    } else if name == "@" {
        Some("name must not be '@'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(GitError::InvalidBranchName {
            name: name.to_string(),
            reason: reason.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

/// Where a tracked branch lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchScope {
    /// Ref in the shared test repository
    Remote,
    /// Ref in the invoking repository
    Local,
}

/// Branches created by this run, in creation order
///
/// Teardown deletes exactly these entries and nothing else, so concurrent
/// runs against the same repository are never touched.
#[derive(Debug, Clone, Default)]
pub struct BranchLedger {
    entries: Vec<(BranchScope, String)>,
}

impl BranchLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a branch; repeated records are ignored
    pub fn record(&mut self, scope: BranchScope, name: impl Into<String>) {
        let name = name.into();
        if !self.contains(scope, &name) {
            log::debug!("Tracking {scope:?} branch '{name}' for teardown");
            self.entries.push((scope, name));
        }
    }

    /// Whether `name` is tracked in `scope`
    pub fn contains(&self, scope: BranchScope, name: &str) -> bool {
        self.entries.iter().any(|(s, n)| *s == scope && n == name)
    }

    /// Tracked names for `scope`, most recent first
    pub fn teardown_order(&self, scope: BranchScope) -> Vec<String> {
        self.entries
            .iter()
            .rev()
            .filter(|(s, _)| *s == scope)
            .map(|(_, n)| n.clone())
            .collect()
    }

    /// True when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
