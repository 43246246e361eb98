//! Feature narrative and its Examples table.
//!
//! Step lines are kept for display only. The scenario is driven by the fixed
//! step list in [`super::steps`], never by matching step text.

use crate::error::{E2eError, FixtureError, Result};
use std::path::{Path, PathBuf};

/// Step keywords recognised in a scenario body
const STEP_KEYWORDS: [&str; 5] = ["Given ", "And ", "When ", "Then ", "But "];

/// One row of the Examples table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioExample {
    /// `partner`, `redhat`, `community`
    pub vendor_type: String,
    /// Vendor name before the uniqueness suffix is applied
    pub vendor: String,
    /// Guidance phrase expected in the first PR comment
    pub message: String,
}

/// Parsed feature file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFile {
    /// Source path
    pub path: PathBuf,
    /// `Feature:` title
    pub title: String,
    /// `Scenario Outline:` title
    pub scenario: String,
    /// Step lines in order
    pub steps: Vec<String>,
    /// Examples table rows
    pub examples: Vec<ScenarioExample>,
}

#[derive(Debug, PartialEq, Eq)]
enum Section {
    Preamble,
    Feature,
    Scenario,
    Examples,
}

fn table_cells(line: &str) -> Option<Vec<String>> {
    let inner = line.strip_prefix('|')?.strip_suffix('|')?;
    Some(inner.split('|').map(|c| c.trim().to_string()).collect())
}

impl FeatureFile {
    /// Read and parse a feature file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                E2eError::from(FixtureError::NotFound {
                    path: path.to_path_buf(),
                })
            } else {
                E2eError::Io(e)
            }
        })?;
        Self::parse(path, &text)
    }

    /// Parse feature text
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let error = |line: usize, reason: &str| -> E2eError {
            FixtureError::Feature {
                path: path.to_path_buf(),
                line,
                reason: reason.to_string(),
            }
            .into()
        };

        let mut section = Section::Preamble;
        let mut title = None;
        let mut scenario = None;
        let mut steps = Vec::new();
        let mut header: Option<Vec<String>> = None;
        let mut examples = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix("Feature:") {
                if title.is_some() {
                    return Err(error(line_no, "more than one Feature"));
                }
                title = Some(rest.trim().to_string());
                section = Section::Feature;
            } else if let Some(rest) = line
                .strip_prefix("Scenario Outline:")
                .or_else(|| line.strip_prefix("Scenario:"))
            {
                if section == Section::Preamble {
                    return Err(error(line_no, "Scenario before Feature"));
                }
                if scenario.is_some() {
                    return Err(error(line_no, "only one scenario is supported"));
                }
                scenario = Some(rest.trim().to_string());
                section = Section::Scenario;
            } else if line.starts_with("Examples:") {
                if section != Section::Scenario {
                    return Err(error(line_no, "Examples outside a scenario"));
                }
                section = Section::Examples;
            } else if section == Section::Scenario
                && STEP_KEYWORDS.iter().any(|k| line.starts_with(k))
            {
                steps.push(line.to_string());
            } else if section == Section::Examples {
                let cells = table_cells(line).ok_or_else(|| error(line_no, "expected a table row"))?;
                match &header {
                    None => header = Some(cells),
                    Some(columns) => {
                        if cells.len() != columns.len() {
                            return Err(error(
                                line_no,
                                &format!("row has {} cells, header has {}", cells.len(), columns.len()),
                            ));
                        }
                        let cell = |name: &str| -> Result<String> {
                            columns
                                .iter()
                                .position(|c| c == name)
                                .map(|i| cells[i].clone())
                                .ok_or_else(|| error(line_no, &format!("missing '{name}' column")))
                        };
                        examples.push(ScenarioExample {
                            vendor_type: cell("vendor_type")?,
                            vendor: cell("vendor")?,
                            message: cell("message")?,
                        });
                    }
                }
            } else if section == Section::Preamble {
                return Err(error(line_no, "text before Feature"));
            }
            // Anything else is free-form description.
        }

        let title = title.ok_or_else(|| error(1, "no Feature"))?;
        let scenario = scenario.ok_or_else(|| error(1, "no Scenario"))?;
        if examples.is_empty() {
            return Err(error(text.lines().count().max(1), "Examples table has no rows"));
        }

        Ok(Self {
            path: path.to_path_buf(),
            title,
            scenario,
            steps,
            examples,
        })
    }
}
