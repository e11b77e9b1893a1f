//! OAuth client secrets.
//!
//! The client secret file is the JSON downloaded from the Google Cloud
//! Console, with either an `installed` or a `web` section.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Default Google authorization endpoint.
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Default Google token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://accounts.google.com/o/oauth2/token";

/// Out-of-band redirect: Google shows the code on a page for the user to copy.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Resolved OAuth client credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
    /// Redirect URI sent with the authorization request.
    pub redirect_uri: String,
    /// Authorization endpoint.
    pub auth_uri: String,
    /// Token endpoint.
    pub token_uri: String,
}

impl Credentials {
    /// Creates credentials pointing at the default Google endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: OOB_REDIRECT_URI.to_string(),
            auth_uri: DEFAULT_AUTH_URI.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        }
    }

    /// Overrides the token endpoint.
    #[must_use]
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Loads credentials from a client secret file.
    pub fn from_file(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AuthError::configuration(format!(
                "failed to read client secret file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from the client secret JSON.
    pub fn from_json(json: &str) -> AuthResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(json).map_err(|e| {
            AuthError::configuration(format!("failed to parse client secret JSON: {}", e))
        })?;

        let app = file.installed.or(file.web).ok_or_else(|| {
            AuthError::configuration("client secret file must contain an 'installed' or 'web' section")
        })?;

        let client_id = app
            .client_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::configuration("client secret file has no client_id"))?;
        let client_secret = app
            .client_secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::configuration("client secret file has no client_secret"))?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri: app
                .redirect_uris
                .into_iter()
                .next()
                .unwrap_or_else(|| OOB_REDIRECT_URI.to_string()),
            auth_uri: app.auth_uri.unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
            token_uri: app.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }
}

/// On-disk shape of a Google Cloud Console client secret file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientSecretFile {
    /// Credentials for installed (desktop) applications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed: Option<AppSecret>,
    /// Credentials for web applications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<AppSecret>,
}

/// One section of a client secret file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSecret {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_provider_x509_cert_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// Serializes `value` with 4-space indentation and writes it to `path`.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> AuthResult<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| AuthError::internal(format!("failed to serialize JSON: {}", e)))?;

    fs::write(path, &buf).map_err(|e| {
        AuthError::io(format!("failed to write {}: {}", path.display(), e)).with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_installed_section() {
        let json = r#"{
            "installed": {
                "client_id": "123.apps.googleusercontent.com",
                "project_id": "addon",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://accounts.google.com/o/oauth2/token",
                "client_secret": "s3cret",
                "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob", "http://localhost"]
            }
        }"#;

        let creds = Credentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "123.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "s3cret");
        assert_eq!(creds.redirect_uri, OOB_REDIRECT_URI);
        assert_eq!(creds.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn parse_web_section_with_defaults() {
        let json = r#"{"web": {"client_id": "id", "client_secret": "secret"}}"#;
        let creds = Credentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.redirect_uri, OOB_REDIRECT_URI);
        assert_eq!(creds.auth_uri, DEFAULT_AUTH_URI);
    }

    #[test]
    fn missing_section_is_rejected() {
        let err = Credentials::from_json(r#"{"client_id": "id"}"#).unwrap_err();
        assert!(err.message().contains("'installed' or 'web'"));
    }

    #[test]
    fn missing_secret_is_rejected() {
        let err = Credentials::from_json(r#"{"installed": {"client_id": "id"}}"#).unwrap_err();
        assert!(err.message().contains("client_secret"));
    }

    #[test]
    fn write_json_file_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json_file(&path, &serde_json::json!({"a": {"b": 1}})).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\n    \"a\": {\n        \"b\": 1\n    }\n}");
    }
}
