//! OAuth token cache.
//!
//! Tokens are stored in the same JSON shape the googleapis client libraries
//! use (`access_token`, `refresh_token`, `token_type`, `expiry_date` in epoch
//! milliseconds), so a cache written by either side can be read by the other.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};

/// An OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer token for API requests.
    pub access_token: String,

    /// Long-lived token for non-interactive renewal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Usually `Bearer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Space separated list of granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Expiry as epoch milliseconds.
    #[serde(
        default,
        deserialize_with = "deserialize_expiry",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry_date: Option<i64>,
}

impl Token {
    /// Creates a token from a token endpoint response.
    ///
    /// `expires_in_secs` is relative to now.
    pub fn issued(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        token_type: Option<String>,
        scope: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            token_type,
            scope,
            expiry_date: expires_in_secs
                .map(|secs| Utc::now().timestamp_millis() + secs.saturating_mul(1000)),
        }
    }

    /// Returns the expiry instant, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry_date.and_then(DateTime::from_timestamp_millis)
    }

    /// Returns true if the expiry instant is known and in the past.
    pub fn is_expired(&self) -> bool {
        self.expires_at().is_some_and(|at| Utc::now() >= at)
    }

    /// Returns true if the token was granted every scope in `scopes`.
    ///
    /// A token with no recorded scope covers nothing.
    pub fn covers_scopes(&self, scopes: &[String]) -> bool {
        let Some(granted) = self.scope.as_deref() else {
            return false;
        };
        let granted: Vec<&str> = granted.split_whitespace().collect();
        scopes.iter().all(|s| granted.contains(&s.as_str()))
    }
}

/// Accepts the expiry as a number or as a numeric string.
///
/// Generated cache files carry whatever the CI environment variable held.
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(v)) => Ok(Some(v)),
        Some(Raw::Float(v)) => Ok(Some(v as i64)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// File-backed token cache.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Creates a cache backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the cache file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached token.
    ///
    /// Returns `Ok(None)` if there is no cache file.
    pub fn load(&self) -> AuthResult<Option<Token>> {
        if !self.path.exists() {
            debug!("no token cache at {:?}", self.path);
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            AuthError::io(format!("failed to read token cache: {}", e)).with_source(e)
        })?;

        let token: Token = serde_json::from_str(&content).map_err(|e| {
            AuthError::configuration(format!(
                "failed to parse token cache {:?}: {}",
                self.path, e
            ))
        })?;

        debug!("loaded token from {:?}", self.path);
        Ok(Some(token))
    }

    /// Writes the token to disk.
    pub fn save(&self, token: &Token) -> AuthResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AuthError::io(format!("failed to create token directory: {}", e)).with_source(e)
            })?;
        }

        let content = serde_json::to_string(token)
            .map_err(|e| AuthError::internal(format!("failed to serialize token: {}", e)))?;

        // Write to temp file first, then rename
        let temp_path = self.path.with_extension("json.tmp");
        write_private(&temp_path, content.as_bytes()).map_err(|e| {
            AuthError::io(format!("failed to write token cache: {}", e)).with_source(e)
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            AuthError::io(format!("failed to rename token cache: {}", e)).with_source(e)
        })?;

        info!("token stored to {:?}", self.path);
        Ok(())
    }

    /// Removes the cache file if present.
    pub fn clear(&self) -> AuthResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                AuthError::io(format!("failed to remove token cache: {}", e)).with_source(e)
            })?;
            info!("cleared token cache {:?}", self.path);
        }
        Ok(())
    }
}

/// Writes `content` to a file readable only by its owner.
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    // mode() only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
            warn!("could not restrict permissions on {:?}: {}", path, e);
        }
    }

    file.write_all(content)?;
    file.sync_all()
}
