//! Error types for deployment operations.

use std::path::PathBuf;

use addonctl_auth::{AuthError, AuthErrorCode};
use thiserror::Error;

/// Errors raised by the deployment steps and the Google API clients.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Required settings are missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Token acquisition failed (code exchange or refresh).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// `clasp version` printed no version number.
    #[error("no version number found in stdout: {output}")]
    VersionParse {
        /// Raw standard output, kept for diagnostics.
        output: String,
    },

    /// An external program exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    Subprocess {
        command: String,
        status: String,
        stderr: String,
    },

    /// The manifest is not a JSON object of the expected shape.
    #[error("invalid manifest {path:?}: {message}")]
    ManifestFormat { path: PathBuf, message: String },

    /// Building the zip archive failed.
    #[error("failed to archive {path:?}: {message}")]
    Archive { path: PathBuf, message: String },

    /// The Chrome Web Store rejected a request, at the HTTP or item level.
    #[error("Chrome Web Store error: {message}")]
    StoreApi {
        /// HTTP status, if the request reached the store.
        status: Option<u16>,
        message: String,
    },

    /// The Apps Script Execution API rejected a request.
    #[error("Apps Script API error: {0}")]
    ScriptApi(String),

    /// A pipeline step ran without the output of an earlier step.
    #[error("step '{step}' is missing its input: {missing}")]
    StepOrder {
        step: &'static str,
        missing: &'static str,
    },

    /// I/O error with context.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    /// Wraps an I/O error with a short description of what was attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a store error.
    pub fn store(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::StoreApi {
            status,
            message: message.into(),
        }
    }

    /// Returns true if this is a failed refresh-token exchange.
    pub fn is_token_refresh(&self) -> bool {
        matches!(self, Self::Auth(e) if e.code() == AuthErrorCode::TokenRefresh)
    }
}

/// A specialized Result type for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = DeployError::store(Some(403), "The caller does not have permission");
        assert_eq!(
            err.to_string(),
            "Chrome Web Store error: The caller does not have permission"
        );
    }

    #[test]
    fn auth_errors_pass_through() {
        let err: DeployError = AuthError::token_refresh("no access_token in response").into();
        assert!(err.is_token_refresh());
        assert_eq!(err.to_string(), "token_refresh: no access_token in response");
    }

    #[test]
    fn version_parse_keeps_output() {
        let err = DeployError::VersionParse {
            output: "Not logged in.".into(),
        };
        assert!(err.to_string().contains("Not logged in."));
    }
}
