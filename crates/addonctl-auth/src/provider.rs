//! Token acquisition for interactive commands.
//!
//! [`TokenProvider`] returns the cached token when there is one, and
//! otherwise walks the user through the authorization code flow. How the code
//! is obtained is up to the [`CodePrompter`].

use std::io::{self, BufRead, Write};

use addonctl_core::BoxFuture;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};
use crate::oauth::OAuthClient;
use crate::tokens::{Token, TokenCache};

/// Turns an authorization URL into an authorization code.
pub trait CodePrompter: Send + Sync {
    /// Presents `authorization_url` and returns the code the user obtained.
    fn prompt<'a>(&'a self, authorization_url: &'a str) -> BoxFuture<'a, AuthResult<String>>;
}

/// Prints the URL and reads the code from standard input.
///
/// Blocks until a line is entered; there is no timeout.
#[derive(Debug, Clone, Default)]
pub struct ConsolePrompter {
    open_browser: bool,
}

impl ConsolePrompter {
    /// Creates a prompter that only prints the URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also try to open the URL in the default browser.
    #[must_use]
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }
}

impl CodePrompter for ConsolePrompter {
    fn prompt<'a>(&'a self, authorization_url: &'a str) -> BoxFuture<'a, AuthResult<String>> {
        Box::pin(async move {
            println!("Authorize this app by visiting this url: {}", authorization_url);

            if self.open_browser
                && let Err(e) = open::that(authorization_url)
            {
                warn!("failed to open browser: {}", e);
            }

            tokio::task::spawn_blocking(read_code_from_stdin)
                .await
                .map_err(|e| AuthError::internal(format!("prompt task failed: {}", e)))?
        })
    }
}

fn read_code_from_stdin() -> AuthResult<String> {
    print!("Enter the code from that page here: ");
    io::stdout()
        .flush()
        .map_err(|e| AuthError::io(format!("failed to flush stdout: {}", e)))?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| AuthError::io(format!("failed to read authorization code: {}", e)))?;

    let code = line.trim();
    if code.is_empty() {
        return Err(AuthError::auth_exchange("no authorization code entered"));
    }
    Ok(code.to_string())
}

/// Hands back a code obtained beforehand, e.g. passed on the command line.
#[derive(Debug, Clone)]
pub struct FixedCodePrompter {
    code: String,
}

impl FixedCodePrompter {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl CodePrompter for FixedCodePrompter {
    fn prompt<'a>(&'a self, authorization_url: &'a str) -> BoxFuture<'a, AuthResult<String>> {
        Box::pin(async move {
            debug!("using pre-supplied code for {}", authorization_url);
            Ok(self.code.clone())
        })
    }
}

/// Obtains a usable token from the cache or through the code flow.
pub struct TokenProvider<P> {
    oauth: OAuthClient,
    cache: TokenCache,
    prompter: P,
}

impl<P: CodePrompter> TokenProvider<P> {
    pub fn new(oauth: OAuthClient, cache: TokenCache, prompter: P) -> Self {
        Self {
            oauth,
            cache,
            prompter,
        }
    }

    /// Returns the token cache.
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Returns a token for `scopes`.
    ///
    /// A cached token is returned as is: neither its expiry nor its scopes
    /// are checked against `scopes`. Failing to write a freshly issued token
    /// to the cache is logged and otherwise ignored.
    pub async fn acquire_token(&self, scopes: &[String]) -> AuthResult<Token> {
        if let Some(token) = self.cache.load()? {
            if token.is_expired() {
                warn!(
                    "cached token in {:?} expired at {:?}, using it anyway",
                    self.cache.path(),
                    token.expires_at()
                );
            }
            debug!("using cached token");
            return Ok(token);
        }

        let url = self.oauth.authorization_url(scopes)?;
        let code = self.prompter.prompt(&url).await?;
        let token = self.oauth.exchange_code(&code, scopes).await?;

        if let Err(e) = self.cache.save(&token) {
            warn!("failed to store token to {:?}: {}", self.cache.path(), e);
        }

        Ok(token)
    }
}
