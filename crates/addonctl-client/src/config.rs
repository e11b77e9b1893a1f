//! Client configuration.
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `addonctl.toml` (`--config`, `$ADDONCTL_CONFIG`, `./addonctl.toml`, or
//!    `~/.config/addonctl/config.toml`, first match wins)
//! 3. environment variables and command-line flags
//!
//! Secret settings (`client_secret`, `refresh_token`) accept the references
//! described in [`crate::secret`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use addonctl_deploy::{ClaspSettings, DeployConfig, TestConfig};
use serde::{Deserialize, Serialize};

use crate::cli::{CredentialPathArgs, DeployArgs, TestArgs};
use crate::error::{ClientError, ClientResult};
use crate::secret::{self, SecretRef};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "addonctl.toml";

/// Default cache for tokens carrying the Chrome Web Store scope.
pub const STORE_TOKEN_FILE: &str = "store_credentials.json";

/// Configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout in seconds for Google API requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,

    /// Client secret and token cache locations.
    pub credentials: CredentialSettings,

    /// Release settings.
    pub deploy: DeploySettings,

    /// Remote test settings.
    pub test: TestSettings,
}

/// Paths used by the interactive commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    /// Token cache for `auth --store`, kept apart from the Apps Script one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_token_file: Option<PathBuf>,
    /// Try to open the authorization URL in a browser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_browser: Option<bool>,
}

/// `[deploy]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clasp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clasp_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
}

/// `[test]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_mode: Option<bool>,
}

impl ClientConfig {
    /// Loads the configuration file.
    ///
    /// An explicit path must exist. Without one, the first existing default
    /// location is used, and no file at all yields the defaults. Returns the
    /// path that was read, if any.
    pub fn load(explicit: Option<&Path>) -> ClientResult<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load_from(path)?, Some(path.to_path_buf())));
        }

        match Self::default_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Ok((Self::load_from(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Candidate locations, in lookup order.
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("addonctl").join("config.toml"));
        }
        paths
    }

    /// Layers command-line and environment values over the file values.
    #[must_use]
    pub fn with_deploy_args(mut self, args: &DeployArgs) -> Self {
        let deploy = &mut self.deploy;
        overlay(&mut deploy.app_id, &args.app_id);
        overlay(&mut deploy.client_id, &args.client_id);
        overlay(&mut deploy.client_secret, &args.client_secret);
        overlay(&mut deploy.refresh_token, &args.refresh_token);
        overlay(&mut deploy.clasp, &args.clasp);
        overlay(&mut deploy.clasp_dir, &args.clasp_dir);
        overlay(&mut deploy.manifest, &args.manifest);
        overlay(&mut deploy.archive_dir, &args.archive_dir);
        overlay(&mut deploy.archive_file, &args.archive_file);
        overlay(&mut deploy.description, &args.description);
        self
    }

    #[must_use]
    pub fn with_test_args(mut self, args: &TestArgs) -> Self {
        self = self.with_credential_args(&args.paths);
        overlay(&mut self.test.script_id, &args.script_id);
        overlay(&mut self.test.function, &args.function);
        if args.no_dev_mode {
            self.test.dev_mode = Some(false);
        }
        if args.no_browser {
            self.credentials.open_browser = Some(false);
        }
        self
    }

    #[must_use]
    pub fn with_credential_args(mut self, args: &CredentialPathArgs) -> Self {
        overlay(&mut self.credentials.client_secret_file, &args.client_secret_file);
        overlay(&mut self.credentials.token_file, &args.token_file);
        self
    }

    #[must_use]
    pub fn with_http_timeout(mut self, secs: Option<u64>) -> Self {
        overlay(&mut self.http_timeout_secs, &secs);
        self
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }

    pub fn open_browser(&self) -> bool {
        self.credentials.open_browser.unwrap_or(true)
    }

    /// Builds and validates the deploy settings.
    pub fn deploy_config(&self) -> ClientResult<DeployConfig> {
        let settings = &self.deploy;
        let defaults = DeployConfig::default();
        let resolve_secret = |value: &Option<String>, name: &str| -> ClientResult<String> {
            value
                .as_deref()
                .map(secret::resolve)
                .transpose()
                .map(Option::unwrap_or_default)
                .map_err(|e| ClientError::Config(format!("{}: {}", name, e)))
        };

        let config = DeployConfig {
            app_id: settings.app_id.clone().unwrap_or_default(),
            client_id: settings.client_id.clone().unwrap_or_default(),
            client_secret: resolve_secret(&settings.client_secret, "client_secret")?,
            refresh_token: resolve_secret(&settings.refresh_token, "refresh_token")?,
            clasp: ClaspSettings {
                program: settings.clasp.clone().unwrap_or(defaults.clasp.program),
                working_dir: settings.clasp_dir.clone(),
                version_description: settings
                    .version_description
                    .clone()
                    .unwrap_or(defaults.clasp.version_description),
            },
            manifest_path: settings.manifest.clone().unwrap_or(defaults.manifest_path),
            archive_dir: settings.archive_dir.clone().unwrap_or(defaults.archive_dir),
            archive_file: settings.archive_file.clone().unwrap_or(defaults.archive_file),
            description_template: settings
                .description
                .clone()
                .unwrap_or(defaults.description_template),
            token_uri: settings.token_uri.clone().unwrap_or(defaults.token_uri),
            http_timeout: self.http_timeout(),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Builds and validates the test settings.
    pub fn test_config(&self) -> ClientResult<TestConfig> {
        let defaults = TestConfig::default();
        let config = TestConfig {
            script_id: self.test.script_id.clone().unwrap_or_default(),
            function: self.test.function.clone().unwrap_or(defaults.function),
            dev_mode: self.test.dev_mode.unwrap_or(defaults.dev_mode),
            client_secret_path: self.client_secret_path(),
            token_path: self.token_path(),
            http_timeout: self.http_timeout(),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    pub fn client_secret_path(&self) -> PathBuf {
        self.credentials
            .client_secret_file
            .clone()
            .unwrap_or_else(|| TestConfig::default().client_secret_path)
    }

    pub fn token_path(&self) -> PathBuf {
        self.credentials
            .token_file
            .clone()
            .unwrap_or_else(|| TestConfig::default().token_path)
    }

    pub fn store_token_path(&self) -> PathBuf {
        self.credentials
            .store_token_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(STORE_TOKEN_FILE))
    }

    /// Returns a copy safe to print: literal secrets are replaced.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for value in [&mut copy.deploy.client_secret, &mut copy.deploy.refresh_token] {
            if let Some(secret) = value.as_mut() {
                let safe = SecretRef::parse(secret).display_safe();
                *secret = safe;
            }
        }
        copy
    }
}

fn overlay<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if let Some(value) = value {
        *target = Some(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::REDACTED;

    const SAMPLE: &str = r#"
http_timeout_secs = 30

[credentials]
client_secret_file = "secrets/client_secret.json"

[deploy]
app_id = "from-file"
client_id = "file-id.apps.googleusercontent.com"
client_secret = "file-secret"
refresh_token = "env::ADDONCTL_TEST_REFRESH_TOKEN"
clasp = "npx @google/clasp"
description = "Sheet tools {version}"

[test]
script_id = "1abc"
"#;

    fn sample() -> ClientConfig {
        toml::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn parses_all_sections() {
        let config = sample();
        assert_eq!(config.http_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.deploy.app_id.as_deref(), Some("from-file"));
        assert_eq!(config.test.script_id.as_deref(), Some("1abc"));
        assert_eq!(
            config.client_secret_path(),
            PathBuf::from("secrets/client_secret.json")
        );
        assert_eq!(config.token_path(), PathBuf::from("credentials.json"));
        assert_eq!(config.store_token_path(), PathBuf::from(STORE_TOKEN_FILE));
    }

    #[test]
    fn store_token_file_is_configurable() {
        let config: ClientConfig =
            toml::from_str("[credentials]\nstore_token_file = \"ci/store.json\"").unwrap();
        assert_eq!(config.store_token_path(), PathBuf::from("ci/store.json"));
        assert_eq!(config.token_path(), PathBuf::from("credentials.json"));
    }

    #[test]
    fn empty_file_is_default() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(config.open_browser());
    }

    #[test]
    fn flags_override_file() {
        let args = DeployArgs {
            app_id: Some("from-flag".into()),
            ..Default::default()
        };
        let config = sample().with_deploy_args(&args);
        assert_eq!(config.deploy.app_id.as_deref(), Some("from-flag"));
        assert_eq!(config.deploy.client_secret.as_deref(), Some("file-secret"));
    }

    #[test]
    fn deploy_config_reports_missing_settings() {
        let err = ClientConfig::default().deploy_config().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("APP_ID"));
        assert!(message.contains("PRODUCTION_CLIENT_REFRESH_TOKEN"));
    }

    #[test]
    fn deploy_config_applies_defaults_and_file_values() {
        let args = DeployArgs {
            refresh_token: Some("1//flag".into()),
            ..Default::default()
        };
        let config = sample().with_deploy_args(&args).deploy_config().unwrap();
        assert_eq!(config.app_id, "from-file");
        assert_eq!(config.client_secret, "file-secret");
        assert_eq!(config.refresh_token, "1//flag");
        assert_eq!(config.clasp.program, "npx @google/clasp");
        assert_eq!(config.description_template, "Sheet tools {version}");
        assert_eq!(config.manifest_path, PathBuf::from("archive/manifest.json"));
        assert_eq!(config.http_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn unresolvable_secret_is_a_config_error() {
        let mut config = sample();
        config.deploy.refresh_token = Some("env::ADDONCTL_SURELY_UNSET_VARIABLE".into());
        let err = config.deploy_config().unwrap_err();
        assert!(matches!(err, ClientError::Config(ref m) if m.starts_with("refresh_token")));
    }

    #[test]
    fn test_args_override_file() {
        let args = TestArgs {
            function: Some("runAll".into()),
            no_dev_mode: true,
            no_browser: true,
            ..Default::default()
        };
        let config = sample().with_test_args(&args);
        assert!(!config.open_browser());

        let test = config.test_config().unwrap();
        assert_eq!(test.script_id, "1abc");
        assert_eq!(test.function, "runAll");
        assert!(!test.dev_mode);
        assert_eq!(test.client_secret_path, PathBuf::from("secrets/client_secret.json"));
    }

    #[test]
    fn redaction_keeps_references() {
        let redacted = sample().redacted();
        assert_eq!(redacted.deploy.client_secret.as_deref(), Some(REDACTED));
        assert_eq!(
            redacted.deploy.refresh_token.as_deref(),
            Some("env::ADDONCTL_TEST_REFRESH_TOKEN")
        );
        assert_eq!(redacted.deploy.app_id.as_deref(), Some("from-file"));
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(Some(dir.path().join("missing.toml").as_path())).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));

        let path = dir.path().join("addonctl.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let (config, used) = ClientConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(used, Some(path));
        assert_eq!(config, sample());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("addonctl.toml");
        std::fs::write(&path, "[deploy\napp_id = 1").unwrap();
        assert!(matches!(
            ClientConfig::load_from(&path),
            Err(ClientError::Config(_))
        ));
    }
}
