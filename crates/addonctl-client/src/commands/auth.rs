//! Authorization command.
//!
//! Tokens for the Chrome Web Store scope live in their own cache so that
//! `auth --store` never hands back, or overwrites, the Apps Script token the
//! `test` command uses.

use std::path::PathBuf;

use addonctl_auth::{CHROME_WEB_STORE_SCOPE, CodePrompter, Token, TokenProvider, default_scopes};
use tracing::info;

use crate::cli::AuthArgs;
use crate::commands::console_token_provider;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Runs the authorization code flow and stores the token.
///
/// With `--force` the cached token is discarded first; otherwise a cached
/// token short-circuits the flow, as long as it was granted the scopes
/// asked for with `--store` or `--scope`.
pub async fn run(config: &ClientConfig, args: &AuthArgs) -> ClientResult<u8> {
    let scopes = requested_scopes(args);
    let open_browser = config.open_browser() && !args.no_browser;
    let provider = console_token_provider(config, cache_path(config, args), open_browser)?;

    let explicit = args.store || !args.scopes.is_empty();
    let token = authorize(&provider, &scopes, explicit, args.force).await?;

    println!("Token stored in {}", provider.cache().path().display());
    match token.refresh_token {
        Some(ref refresh_token) => println!("Refresh token: {}", refresh_token),
        None => println!("No refresh token in the stored token; run with --force to authorize again."),
    }
    Ok(0)
}

/// Returns a token for `scopes`, clearing the cache first when `force` is
/// set or when `check_scopes` is set and the cached token lacks a scope.
///
/// Tokens written by `credentials generate` carry no scope, so the check is
/// only made for scopes the user asked for explicitly.
async fn authorize<P: CodePrompter>(
    provider: &TokenProvider<P>,
    scopes: &[String],
    check_scopes: bool,
    force: bool,
) -> ClientResult<Token> {
    let cache = provider.cache();
    if force {
        cache.clear()?;
        info!("cleared cached token {:?}", cache.path());
    } else if check_scopes
        && let Some(cached) = cache.load()?
        && !cached.covers_scopes(scopes)
    {
        info!(
            "cached token in {:?} was granted {:?}, authorizing again",
            cache.path(),
            cached.scope.as_deref().unwrap_or_default()
        );
        cache.clear()?;
    }

    Ok(provider.acquire_token(scopes).await?)
}

/// `--token-file` wins; otherwise `--store` uses the store cache.
fn cache_path(config: &ClientConfig, args: &AuthArgs) -> PathBuf {
    match (&args.paths.token_file, args.store) {
        (Some(path), _) => path.clone(),
        (None, true) => config.store_token_path(),
        (None, false) => config.token_path(),
    }
}

fn requested_scopes(args: &AuthArgs) -> Vec<String> {
    if args.store {
        vec![CHROME_WEB_STORE_SCOPE.to_string()]
    } else if args.scopes.is_empty() {
        default_scopes()
    } else {
        args.scopes.clone()
    }
}
