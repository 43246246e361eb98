//! Chart verifier report fixture.

use crate::error::{E2eError, FixtureError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct ReportDocument {
    metadata: ReportMetadata,
}

#[derive(Debug, Deserialize)]
struct ReportMetadata {
    chart: ReportChart,
}

#[derive(Debug, Deserialize)]
struct ReportChart {
    name: String,
    version: String,
}

/// The report template plus the chart identity it describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartReport {
    /// Where the fixture was read from
    pub path: PathBuf,
    /// Unrendered template text
    pub template: String,
    /// `metadata.chart.name`
    pub chart_name: String,
    /// `metadata.chart.version`
    pub chart_version: semver::Version,
}

impl ChartReport {
    /// Read and parse the report fixture
    pub fn load(path: &Path) -> Result<Self> {
        let template = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                E2eError::from(FixtureError::NotFound {
                    path: path.to_path_buf(),
                })
            } else {
                E2eError::Io(e)
            }
        })?;
        Self::parse(path, template)
    }

    /// Parse report text already in memory
    ///
    /// The `${repository}`/`${branch}` placeholders sit inside string values,
    /// so the unrendered template is still valid YAML.
    pub fn parse(path: &Path, template: String) -> Result<Self> {
        let malformed = |reason: String| FixtureError::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        let document: ReportDocument =
            serde_yaml::from_str(&template).map_err(|e| malformed(e.to_string()))?;
        let chart = document.metadata.chart;

        if chart.name.trim().is_empty() {
            return Err(malformed("metadata.chart.name is empty".to_string()).into());
        }
        let chart_version = semver::Version::parse(chart.version.trim()).map_err(|e| {
            malformed(format!(
                "metadata.chart.version '{}' is not a version: {}",
                chart.version, e
            ))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            template,
            chart_name: chart.name,
            chart_version,
        })
    }
}
