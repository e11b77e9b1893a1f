//! Client error types.

use std::fmt;

use addonctl_auth::AuthError;
use addonctl_deploy::DeployError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Authentication failed.
    Auth(AuthError),
    /// A deploy or test step failed.
    Deploy(DeployError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Auth(err) => write!(f, "authentication failed: {}", err),
            Self::Deploy(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Auth(err) => Some(err),
            Self::Deploy(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<DeployError> for ClientError {
    fn from(err: DeployError) -> Self {
        match err {
            DeployError::Config(msg) => Self::Config(msg),
            DeployError::Auth(err) => Self::Auth(err),
            other => Self::Deploy(other),
        }
    }
}
