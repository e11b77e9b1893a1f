//! Remote test command.

use addonctl_auth::default_scopes;
use addonctl_deploy::{ScriptOutcome, ScriptRunner};
use tracing::{error, info};

use crate::commands::console_token_provider;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Runs the test function and returns its failure count as the exit code.
pub async fn run(config: &ClientConfig) -> ClientResult<u8> {
    let test_config = config.test_config()?;
    let provider = console_token_provider(config, config.token_path(), config.open_browser())?;
    let token = provider.acquire_token(&default_scopes()).await?;

    let runner = ScriptRunner::new(&test_config.script_api_base, test_config.http_timeout)?;
    info!(
        "running {} in script {}",
        test_config.function, test_config.script_id
    );
    let outcome = runner
        .run_function(
            &token.access_token,
            &test_config.script_id,
            &test_config.function,
            test_config.dev_mode,
        )
        .await?;

    report(&outcome);
    Ok(outcome.exit_code())
}

fn report(outcome: &ScriptOutcome) {
    match outcome {
        ScriptOutcome::Completed { log, failures } => {
            print!("{}", log);
            if !log.is_empty() && !log.ends_with('\n') {
                println!();
            }
            if *failures == 0 {
                info!("all tests passed");
            } else {
                error!("{} test(s) failed", failures);
            }
        }
        ScriptOutcome::ScriptError(failure) => {
            error!(
                "script error: {} ({})",
                failure.message,
                failure.error_type.as_deref().unwrap_or("unknown type")
            );
            for frame in &failure.stack {
                error!(
                    "    at {} (line {})",
                    frame.function.as_deref().unwrap_or("<anonymous>"),
                    frame
                        .line_number
                        .map_or_else(|| "?".to_string(), |n| n.to_string())
                );
            }
        }
    }
}
