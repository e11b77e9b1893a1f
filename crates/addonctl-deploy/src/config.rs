//! Settings for the `deploy` and `test` commands.
//!
//! Both structs are filled in by the client from defaults, the TOML file,
//! and the environment, then validated once before anything runs.

use std::path::PathBuf;
use std::time::Duration;

use addonctl_auth::credentials::DEFAULT_TOKEN_URI;

use crate::error::{DeployError, DeployResult};
use crate::script::SCRIPT_API_BASE;
use crate::store::{STORE_API_BASE, STORE_UPLOAD_BASE};

/// Placeholder replaced by the version number in the manifest description.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Default manifest description.
pub const DEFAULT_DESCRIPTION_TEMPLATE: &str = "Spreadsheet Add-on - PRODUCTION - version {version}";

/// How to invoke clasp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaspSettings {
    /// Program name or path.
    pub program: String,
    /// Directory holding `.clasp.json`; the current directory if unset.
    pub working_dir: Option<PathBuf>,
    /// Description passed to `clasp version`.
    pub version_description: String,
}

impl Default for ClaspSettings {
    fn default() -> Self {
        Self {
            program: "clasp".to_string(),
            working_dir: None,
            version_description: "new version".to_string(),
        }
    }
}

/// Everything the deploy pipeline needs.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Chrome Web Store item id, used for both upload and publish.
    pub app_id: String,
    /// OAuth client id for the refresh exchange.
    pub client_id: String,
    /// OAuth client secret for the refresh exchange.
    pub client_secret: String,
    /// Refresh token carrying the Chrome Web Store scope.
    pub refresh_token: String,
    pub clasp: ClaspSettings,
    /// Manifest patched with the new version.
    pub manifest_path: PathBuf,
    /// Directory zipped into the store package.
    pub archive_dir: PathBuf,
    /// Zip file written and uploaded.
    pub archive_file: PathBuf,
    /// Manifest description; must contain `{version}`.
    pub description_template: String,
    pub token_uri: String,
    pub store_upload_base: String,
    pub store_api_base: String,
    /// Applied to HTTP requests only; none by default.
    pub http_timeout: Option<Duration>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            clasp: ClaspSettings::default(),
            manifest_path: PathBuf::from("archive/manifest.json"),
            archive_dir: PathBuf::from("archive"),
            archive_file: PathBuf::from("archive.zip"),
            description_template: DEFAULT_DESCRIPTION_TEMPLATE.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            store_upload_base: STORE_UPLOAD_BASE.to_string(),
            store_api_base: STORE_API_BASE.to_string(),
            http_timeout: None,
        }
    }
}

impl DeployConfig {
    /// Checks every required setting and reports all missing ones at once.
    pub fn validate(&self) -> DeployResult<()> {
        let required = [
            ("APP_ID", &self.app_id),
            ("PRODUCTION_CLIENT_ID", &self.client_id),
            ("PRODUCTION_CLIENT_SECRET", &self.client_secret),
            ("PRODUCTION_CLIENT_REFRESH_TOKEN", &self.refresh_token),
        ];
        let missing = missing_names(&required);
        if !missing.is_empty() {
            return Err(DeployError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if self.clasp.program.trim().is_empty() {
            return Err(DeployError::Config("clasp program must not be empty".into()));
        }

        if !self.description_template.contains(VERSION_PLACEHOLDER) {
            return Err(DeployError::Config(format!(
                "description template must contain {}",
                VERSION_PLACEHOLDER
            )));
        }

        Ok(())
    }
}

/// Everything the remote test command needs.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Apps Script project id.
    pub script_id: String,
    /// Function executed through `scripts.run`.
    pub function: String,
    /// Run the most recently saved code instead of the deployed version.
    pub dev_mode: bool,
    pub client_secret_path: PathBuf,
    pub token_path: PathBuf,
    pub script_api_base: String,
    pub http_timeout: Option<Duration>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            script_id: String::new(),
            function: "gastTestRunner".to_string(),
            dev_mode: true,
            client_secret_path: PathBuf::from("client_secret.json"),
            token_path: PathBuf::from("credentials.json"),
            script_api_base: SCRIPT_API_BASE.to_string(),
            http_timeout: None,
        }
    }
}

impl TestConfig {
    /// Checks every required setting.
    pub fn validate(&self) -> DeployResult<()> {
        let missing = missing_names(&[("SCRIPT_ID", &self.script_id)]);
        if !missing.is_empty() {
            return Err(DeployError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }
        if self.function.trim().is_empty() {
            return Err(DeployError::Config("function name must not be empty".into()));
        }
        Ok(())
    }
}

fn missing_names(required: &[(&'static str, &String)]) -> Vec<&'static str> {
    required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect()
}
