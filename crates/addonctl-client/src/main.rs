//! addonctl CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use addonctl_client::cli::{Cli, Command, ConfigAction, CredentialsAction};
use addonctl_client::commands;
use addonctl_client::config::ClientConfig;
use addonctl_client::error::ClientResult;
use addonctl_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Some(format) = cli.log_format {
        tracing_config = tracing_config.with_format(format);
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<u8> {
    let (config, source) = ClientConfig::load(cli.config.as_deref())?;
    let config = config.with_http_timeout(cli.http_timeout);

    match cli.command {
        Command::Deploy(args) => commands::deploy::run(&config.with_deploy_args(&args)).await,
        Command::Auth(args) => {
            let config = config.with_credential_args(&args.paths);
            commands::auth::run(&config, &args).await
        }
        Command::Test(args) => commands::test::run(&config.with_test_args(&args)).await,
        Command::Credentials { action } => match action {
            CredentialsAction::Generate { dir, clasprc } => {
                commands::credentials::generate(&dir, clasprc)
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Dump { deploy, test } => {
                let config = config.with_deploy_args(&deploy).with_test_args(&test);
                commands::config::dump(&config, source.as_deref())
            }
            ConfigAction::Path => commands::config::path(source.as_deref()),
        },
    }
}
