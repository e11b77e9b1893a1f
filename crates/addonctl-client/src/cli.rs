//! Command-line interface definition.

use std::path::PathBuf;

use addonctl_core::TracingOutputFormat;
use clap::{Args, Parser, Subcommand};

/// addonctl - release and test a Google Sheets add-on
#[derive(Debug, Parser)]
#[command(name = "addonctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "ADDONCTL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log format: pretty, compact or json
    #[arg(long, env = "ADDONCTL_LOG_FORMAT", global = true)]
    pub log_format: Option<TracingOutputFormat>,

    /// Timeout in seconds for Google API requests (none by default)
    #[arg(long, env = "ADDONCTL_HTTP_TIMEOUT", global = true)]
    pub http_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Version and deploy the script, then publish the package to the Chrome Web Store
    Deploy(DeployArgs),

    /// Authorize addonctl and store the resulting token
    Auth(AuthArgs),

    /// Run the add-on's test suite remotely through the Apps Script API
    Test(TestArgs),

    /// Credential file commands
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Settings for `deploy`. Each one overrides `addonctl.toml`.
#[derive(Debug, Clone, Default, Args)]
pub struct DeployArgs {
    /// Chrome Web Store item id
    #[arg(long, env = "APP_ID")]
    pub app_id: Option<String>,

    /// OAuth client id used for the refresh exchange
    #[arg(long, env = "PRODUCTION_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret used for the refresh exchange
    #[arg(long, env = "PRODUCTION_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Refresh token carrying the Chrome Web Store scope
    #[arg(long, env = "PRODUCTION_CLIENT_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// clasp program, optionally with leading arguments (e.g. "npx @google/clasp")
    #[arg(long)]
    pub clasp: Option<String>,

    /// Directory holding .clasp.json
    #[arg(long)]
    pub clasp_dir: Option<PathBuf>,

    /// Store manifest patched with the new version
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Directory packaged for the store
    #[arg(long)]
    pub archive_dir: Option<PathBuf>,

    /// Zip file written and uploaded
    #[arg(long)]
    pub archive_file: Option<PathBuf>,

    /// Manifest description; {version} is replaced by the version number
    #[arg(long)]
    pub description: Option<String>,
}

/// Where the client secret and the token cache live.
#[derive(Debug, Clone, Default, Args)]
pub struct CredentialPathArgs {
    /// Google Cloud Console client secret file
    #[arg(long)]
    pub client_secret_file: Option<PathBuf>,

    /// Token cache file
    #[arg(long)]
    pub token_file: Option<PathBuf>,
}

/// Settings for `auth`.
#[derive(Debug, Clone, Default, Args)]
pub struct AuthArgs {
    #[command(flatten)]
    pub paths: CredentialPathArgs,

    /// Scope to request (can be repeated; defaults to the Apps Script scopes)
    #[arg(long = "scope", action = clap::ArgAction::Append)]
    pub scopes: Vec<String>,

    /// Request the Chrome Web Store scope, for minting the deploy refresh token
    #[arg(long, conflicts_with = "scopes")]
    pub store: bool,

    /// Discard the cached token and authorize again
    #[arg(long, short)]
    pub force: bool,

    /// Do not try to open the authorization URL in a browser
    #[arg(long)]
    pub no_browser: bool,
}

/// Settings for `test`.
#[derive(Debug, Clone, Default, Args)]
pub struct TestArgs {
    #[command(flatten)]
    pub paths: CredentialPathArgs,

    /// Apps Script project id
    #[arg(long, env = "SCRIPT_ID")]
    pub script_id: Option<String>,

    /// Function to run
    #[arg(long)]
    pub function: Option<String>,

    /// Run the deployed code instead of the latest saved code
    #[arg(long)]
    pub no_dev_mode: bool,

    /// Do not try to open the authorization URL in a browser
    #[arg(long)]
    pub no_browser: bool,
}

/// Credential file actions.
#[derive(Debug, Subcommand)]
pub enum CredentialsAction {
    /// Write client_secret.json, ~/.clasprc.json, credentials.json and .clasp.json
    /// from environment variables
    Generate {
        /// Directory for the project files
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Where to write the clasp login (defaults to ~/.clasprc.json)
        #[arg(long)]
        clasprc: Option<PathBuf>,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective configuration with secrets redacted
    Dump {
        #[command(flatten)]
        deploy: DeployArgs,

        #[command(flatten)]
        test: TestArgs,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn auth_scopes_repeat() {
        let cli = Cli::parse_from([
            "addonctl",
            "auth",
            "--scope",
            "https://www.googleapis.com/auth/a",
            "--scope",
            "https://www.googleapis.com/auth/b",
            "--force",
        ]);
        let Command::Auth(args) = cli.command else {
            panic!("expected auth");
        };
        assert_eq!(args.scopes.len(), 2);
        assert!(args.force);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["addonctl", "config", "path", "--debug", "--log-format", "json"]);
        assert!(cli.debug);
        assert_eq!(cli.log_format, Some(TracingOutputFormat::Json));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(Cli::try_parse_from(["addonctl", "--log-format", "xml", "config", "path"]).is_err());
    }
}
