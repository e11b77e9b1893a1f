//! Command implementations.
//!
//! Each command returns the process exit code on success; errors are
//! reported by `main`.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod deploy;
pub mod test;

use std::path::PathBuf;

use addonctl_auth::{ConsolePrompter, Credentials, OAuthClient, TokenCache, TokenProvider};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Builds the interactive token provider from the configured client secret,
/// caching tokens in `token_path`.
pub(crate) fn console_token_provider(
    config: &ClientConfig,
    token_path: PathBuf,
    open_browser: bool,
) -> ClientResult<TokenProvider<ConsolePrompter>> {
    let credentials = Credentials::from_file(config.client_secret_path())?;
    let oauth = OAuthClient::new(credentials, config.http_timeout())?;
    let cache = TokenCache::new(token_path);
    Ok(TokenProvider::new(
        oauth,
        cache,
        ConsolePrompter::new().with_browser(open_browser),
    ))
}
