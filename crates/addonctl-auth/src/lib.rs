//! Google OAuth for addonctl.
//!
//! - [`credentials`]: client secret files
//! - [`tokens`]: the on-disk token cache
//! - [`oauth`]: authorization code and refresh token exchanges
//! - [`provider`]: cached-or-interactive token acquisition
//! - [`generate`]: writing credential files from CI environment variables

pub mod credentials;
pub mod error;
pub mod generate;
pub mod oauth;
pub mod provider;
pub mod tokens;

pub use credentials::Credentials;
pub use error::{AuthError, AuthErrorCode, AuthResult};
pub use oauth::OAuthClient;
pub use provider::{CodePrompter, ConsolePrompter, FixedCodePrompter, TokenProvider};
pub use tokens::{Token, TokenCache};

/// Scopes the interactive commands request by default.
pub const SCRIPT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/script.processes",
    "https://www.googleapis.com/auth/script.projects",
    "https://www.googleapis.com/auth/script.container.ui",
    "https://www.googleapis.com/auth/script.external_request",
    "https://www.googleapis.com/auth/script.deployments",
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.metadata.readonly",
    "https://www.googleapis.com/auth/script.webapp.deploy",
    "https://www.googleapis.com/auth/cloud-platform.read-only",
    "https://www.googleapis.com/auth/logging.read",
];

/// Scope needed to mint the refresh token used by `deploy`.
pub const CHROME_WEB_STORE_SCOPE: &str = "https://www.googleapis.com/auth/chromewebstore";

/// Returns [`SCRIPT_SCOPES`] as owned strings.
pub fn default_scopes() -> Vec<String> {
    SCRIPT_SCOPES.iter().map(|s| s.to_string()).collect()
}
