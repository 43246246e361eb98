//! chart_owners_e2e - functional test for unauthorized chart submissions.
//!
//! Exits 0 when every selected example passes, 1 on an assertion failure,
//! 2 on a setup failure, and 3 when a bounded wait times out.

use chart_owners_e2e::cli;
use chart_owners_e2e::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // Never quiet for fatal errors
            let output = OutputManager::new(false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    let _ = output.indent(&suggestion);
                }
            }

            process::exit(e.category().exit_code());
        }
    }
}
