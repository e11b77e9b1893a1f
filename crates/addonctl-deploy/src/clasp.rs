//! Versioning and deploying the Apps Script project through clasp.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::config::ClaspSettings;
use crate::error::{DeployError, DeployResult};

static CREATED_VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Created version (\d+)").expect("Invalid created version regex")
});

/// A script version number as printed by clasp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the version number from `clasp version` output.
pub fn parse_created_version(stdout: &str) -> DeployResult<VersionId> {
    CREATED_VERSION_REGEX
        .captures(stdout)
        .and_then(|caps| caps.get(1))
        .map(|m| VersionId::new(m.as_str()))
        .ok_or_else(|| DeployError::VersionParse {
            output: stdout.to_string(),
        })
}

/// Runs clasp as a child process.
///
/// The configured program may carry leading arguments separated by
/// whitespace, e.g. `npx @google/clasp`.
#[derive(Debug, Clone)]
pub struct ClaspRunner {
    program: String,
    leading_args: Vec<String>,
    working_dir: Option<PathBuf>,
    version_description: String,
}

impl ClaspRunner {
    pub fn new(settings: &ClaspSettings) -> Self {
        let mut words = settings.program.split_whitespace().map(str::to_string);
        Self {
            program: words.next().unwrap_or_default(),
            leading_args: words.collect(),
            working_dir: settings.working_dir.clone(),
            version_description: settings.version_description.clone(),
        }
    }

    /// Creates an immutable version of the script and returns its number.
    pub async fn create_version(&self) -> DeployResult<VersionId> {
        let stdout = self
            .run(&["version".to_string(), self.version_description.clone()])
            .await?;
        parse_created_version(&stdout)
    }

    /// Deploys `version`. The output is not inspected.
    pub async fn deploy_version(&self, version: &VersionId) -> DeployResult<VersionId> {
        self.run(&[
            "deploy".to_string(),
            version.to_string(),
            format!("deploy version {}", version),
        ])
        .await?;
        Ok(version.clone())
    }

    async fn run(&self, args: &[String]) -> DeployResult<String> {
        let command_line = self
            .leading_args
            .iter()
            .chain(args)
            .fold(self.program.clone(), |line, arg| format!("{} {}", line, arg));
        debug!("running `{}`", command_line);

        let mut command = Command::new(&self.program);
        command.args(&self.leading_args).args(args);
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .map_err(|e| DeployError::io(format!("failed to run `{}`", command_line), e))?;

        if !output.status.success() {
            return Err(DeployError::Subprocess {
                command: command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("clasp output: {}", stdout.trim());
        Ok(stdout)
    }
}
