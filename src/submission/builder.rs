//! Stages an unauthorized chart submission on the base and PR branches.

use super::layout::ChartLayout;
use super::report::ChartReport;
use crate::branch::BranchNames;
use crate::error::{FixtureError, Result};
use crate::git::{GitWorkflow, Workspace};
use crate::template::{ReportFields, render};
use std::path::{Path, PathBuf};

/// Files written by a completed build, relative to the worktree root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSubmission {
    /// OWNERS file pushed to the base branch
    pub owners_path: PathBuf,
    /// Chart archive pushed to the PR branch
    pub archive_path: PathBuf,
    /// Rendered report pushed to the PR branch
    pub report_path: PathBuf,
}

/// Everything needed to stage one submission
#[derive(Debug)]
pub struct SubmissionBuilder<'a> {
    /// Target layout
    pub layout: &'a ChartLayout,
    /// Rendered OWNERS document
    pub owners_content: &'a str,
    /// Report fixture
    pub report: &'a ChartReport,
    /// Chart archive fixture
    pub chart_archive: &'a Path,
    /// `owner/name` substituted into the report
    pub test_repo: &'a str,
    /// Base and PR branches
    pub branches: &'a BranchNames,
}

impl SubmissionBuilder<'_> {
    /// Reset, write, commit, and push. Each step completes before the next.
    pub async fn build(
        &self,
        workflow: &mut GitWorkflow,
        workspace: &Workspace,
    ) -> Result<StagedSubmission> {
        let layout = self.layout;
        let base = &self.branches.base;

        let archive_name = self
            .chart_archive
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FixtureError::Malformed {
                path: self.chart_archive.to_path_buf(),
                reason: "chart archive path has no file name".to_string(),
            })?
            .to_string();
        if !self.chart_archive.is_file() {
            return Err(FixtureError::NotFound {
                path: self.chart_archive.to_path_buf(),
            }
            .into());
        }

        // Render before touching any branch so a bad fixture aborts early.
        let report_content = render(&self.report.template, &ReportFields {
            repository: self.test_repo,
            branch: base,
        })?;

        // Clears OWNERS and every version already submitted for this chart.
        workflow
            .reset_path(workspace, &layout.chart_dir(), base)
            .await?;

        let owners_path = layout.owners_path();
        tokio::fs::create_dir_all(workspace.in_worktree(layout.version_dir())).await?;
        tokio::fs::write(workspace.in_worktree(&owners_path), self.owners_content).await?;

        log::info!(
            "Push OWNERS file to '{}:{}'",
            self.test_repo,
            self.branches.base
        );
        workflow
            .push_base(
                workspace,
                &[owners_path.as_path()],
                &format!(
                    "Add {} {} OWNERS file",
                    layout.vendor, layout.chart_name
                ),
                base,
            )
            .await?;

        let archive_path = layout.archive_path(&archive_name);
        tokio::fs::copy(self.chart_archive, workspace.in_worktree(&archive_path)).await?;

        let report_path = layout.report_path();
        tokio::fs::write(workspace.in_worktree(&report_path), report_content).await?;

        log::info!(
            "Push chart files to '{}:{}'",
            self.test_repo,
            self.branches.pr
        );
        workflow
            .push_pr(
                workspace,
                &[archive_path.as_path(), report_path.as_path()],
                &format!(
                    "Add {} {} {} chart",
                    layout.vendor, layout.chart_name, layout.chart_version
                ),
                &self.branches.pr,
            )
            .await?;

        Ok(StagedSubmission {
            owners_path,
            archive_path,
            report_path,
        })
    }
}
