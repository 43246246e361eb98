//! Command line interface for chart_owners_e2e.
//!
//! Loads the feature narrative, resolves configuration from the environment,
//! and runs each selected Examples row through the scenario runner.

mod args;
mod output;

pub use args::{Args, DEFAULT_FEATURE};
pub use output::OutputManager;

use crate::config::SuiteConfig;
use crate::error::{ConfigError, Result};
use crate::github::GitHubClient;
use crate::scenario::{FeatureFile, ScenarioExample, ScenarioRunner};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(&args).await
}

/// Rows chosen by `--example`, paired with their index
pub fn select_examples(
    feature: &FeatureFile,
    index: Option<usize>,
) -> Result<Vec<(usize, &ScenarioExample)>> {
    match index {
        None => Ok(feature.examples.iter().enumerate().collect()),
        Some(i) => feature
            .examples
            .get(i)
            .map(|example| vec![(i, example)])
            .ok_or_else(|| {
                ConfigError::InvalidValue {
                    variable: "--example".to_string(),
                    reason: format!(
                        "index {i} out of range; {} has {} row(s)",
                        feature.path.display(),
                        feature.examples.len()
                    ),
                }
                .into()
            }),
    }
}

/// Run the suite for parsed arguments and return the process exit code
pub async fn execute(args: &Args) -> Result<i32> {
    let output = OutputManager::new(args.quiet);
    let feature = FeatureFile::load(&args.feature_path())?;
    let selected = select_examples(&feature, args.example)?;

    if args.list {
        output.section(&feature.scenario)?;
        for (index, example) in selected {
            output.example(index, example)?;
        }
        return Ok(0);
    }

    output.info(&format!(
        "{} example(s) from {}",
        selected.len(),
        feature.path.display()
    ))?;
    let config = SuiteConfig::from_env()?;
    log::info!(
        "Testing against '{}' as '{}'",
        config.test_repo,
        config.bot.name
    );
    let api = GitHubClient::new(config.api_url.clone(), config.bot.token.clone())?;
    let runner = ScenarioRunner::new(api, config, args.repo.clone());

    let mut exit_code = 0;
    for (index, example) in selected {
        output.section(&format!("{} [{index}]", feature.scenario))?;
        let report = runner.run(example).await;
        output.report(&report)?;
        if exit_code == 0
            && let Some(category) = report.failure_category()
        {
            exit_code = category.exit_code();
        }
    }
    Ok(exit_code)
}
