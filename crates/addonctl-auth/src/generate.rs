//! Credential files for CI jobs.
//!
//! A CI runner has no interactive login, so the client secret, the clasp
//! login, the token cache, and the clasp project file are written from
//! environment variables before any other command runs.

use std::env;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::credentials::{
    AppSecret, ClientSecretFile, DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI, OOB_REDIRECT_URI,
    write_json_file,
};
use crate::error::{AuthError, AuthResult};

const CERTS_URL: &str = "https://www.googleapis.com/oauth2/v1/certs";

/// Values read from the environment. Unset values are left out of the files.
#[derive(Debug, Clone, Default)]
pub struct CredentialEnv {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub project_id: Option<String>,
    pub clasprc_access_token: Option<String>,
    pub clasprc_refresh_token: Option<String>,
    pub clasprc_expiry_date: Option<String>,
    pub client_access_token: Option<String>,
    pub client_refresh_token: Option<String>,
    pub client_expiry_date: Option<String>,
    pub script_id: Option<String>,
}

impl CredentialEnv {
    /// Reads `CLIENT_ID`, `CLIENT_SECRET`, `PROJECT_ID`, `CLASPRC_*`,
    /// `CLIENT_*_TOKEN`, `CLIENT_EXPIRY_DATE` and `SCRIPT_ID`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the values from an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            client_id: lookup("CLIENT_ID"),
            client_secret: lookup("CLIENT_SECRET"),
            project_id: lookup("PROJECT_ID"),
            clasprc_access_token: lookup("CLASPRC_ACCESS_TOKEN"),
            clasprc_refresh_token: lookup("CLASPRC_REFRESH_TOKEN"),
            clasprc_expiry_date: lookup("CLASPRC_EXPIRY_DATE"),
            client_access_token: lookup("CLIENT_ACCESS_TOKEN"),
            client_refresh_token: lookup("CLIENT_REFRESH_TOKEN"),
            client_expiry_date: lookup("CLIENT_EXPIRY_DATE"),
            script_id: lookup("SCRIPT_ID"),
        }
    }
}

/// Where each generated file goes.
#[derive(Debug, Clone)]
pub struct CredentialTargets {
    pub client_secret: PathBuf,
    pub clasprc: PathBuf,
    pub token_cache: PathBuf,
    pub clasp_project: PathBuf,
}

impl CredentialTargets {
    /// Default layout: project files in `project_dir`, `.clasprc.json` in the
    /// home directory.
    pub fn in_dir(project_dir: &Path) -> AuthResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| AuthError::configuration("could not determine home directory"))?;
        Ok(Self {
            client_secret: project_dir.join("client_secret.json"),
            clasprc: home.join(".clasprc.json"),
            token_cache: project_dir.join("credentials.json"),
            clasp_project: project_dir.join(".clasp.json"),
        })
    }
}

#[derive(Debug, Serialize)]
struct StoredLogin<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    token_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiry_date: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ClaspProject<'a> {
    #[serde(rename = "scriptId", skip_serializing_if = "Option::is_none")]
    script_id: Option<&'a str>,
}

/// Writes the four credential files and returns their paths.
pub fn generate_credential_files(
    values: &CredentialEnv,
    targets: &CredentialTargets,
) -> AuthResult<Vec<PathBuf>> {
    let client_secret = ClientSecretFile {
        installed: Some(AppSecret {
            client_id: values.client_id.clone(),
            project_id: values.project_id.clone(),
            auth_uri: Some(DEFAULT_AUTH_URI.to_string()),
            token_uri: Some(DEFAULT_TOKEN_URI.to_string()),
            auth_provider_x509_cert_url: Some(CERTS_URL.to_string()),
            client_secret: values.client_secret.clone(),
            redirect_uris: vec![OOB_REDIRECT_URI.to_string(), "http://localhost".to_string()],
        }),
        web: None,
    };
    write_json_file(&targets.client_secret, &client_secret)?;

    let clasprc = StoredLogin {
        access_token: values.clasprc_access_token.as_deref(),
        token_type: "Bearer",
        refresh_token: values.clasprc_refresh_token.as_deref(),
        expiry_date: values.clasprc_expiry_date.as_deref(),
    };
    write_json_file(&targets.clasprc, &clasprc)?;

    let cache = StoredLogin {
        access_token: values.client_access_token.as_deref(),
        token_type: "Bearer",
        refresh_token: values.client_refresh_token.as_deref(),
        expiry_date: values.client_expiry_date.as_deref(),
    };
    write_json_file(&targets.token_cache, &cache)?;

    let project = ClaspProject {
        script_id: values.script_id.as_deref(),
    };
    write_json_file(&targets.clasp_project, &project)?;

    let written = vec![
        targets.client_secret.clone(),
        targets.clasprc.clone(),
        targets.token_cache.clone(),
        targets.clasp_project.clone(),
    ];
    for path in &written {
        info!("wrote {:?}", path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use super::*;
    use crate::credentials::Credentials;
    use crate::tokens::TokenCache;

    fn targets(dir: &Path) -> CredentialTargets {
        CredentialTargets {
            client_secret: dir.join("client_secret.json"),
            clasprc: dir.join(".clasprc.json"),
            token_cache: dir.join("credentials.json"),
            clasp_project: dir.join(".clasp.json"),
        }
    }

    #[test]
    fn generated_files_are_readable_back() {
        let vars: HashMap<&str, &str> = [
            ("CLIENT_ID", "id.apps.googleusercontent.com"),
            ("CLIENT_SECRET", "secret"),
            ("PROJECT_ID", "addon-project"),
            ("CLIENT_ACCESS_TOKEN", "ya29.token"),
            ("CLIENT_REFRESH_TOKEN", "1//refresh"),
            ("CLIENT_EXPIRY_DATE", "1700000000000"),
            ("SCRIPT_ID", "script-123"),
        ]
        .into_iter()
        .collect();
        let values = CredentialEnv::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        let dir = tempfile::tempdir().unwrap();
        let targets = targets(dir.path());
        let written = generate_credential_files(&values, &targets).unwrap();
        assert_eq!(written.len(), 4);

        let creds = Credentials::from_file(&targets.client_secret).unwrap();
        assert_eq!(creds.client_id, "id.apps.googleusercontent.com");
        assert_eq!(creds.redirect_uri, OOB_REDIRECT_URI);

        let token = TokenCache::new(&targets.token_cache).load().unwrap().unwrap();
        assert_eq!(token.access_token, "ya29.token");
        assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(token.expiry_date, Some(1_700_000_000_000));

        let project = fs::read_to_string(&targets.clasp_project).unwrap();
        assert_eq!(project, "{\n    \"scriptId\": \"script-123\"\n}");
    }

    #[test]
    fn unset_values_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let targets = targets(dir.path());
        generate_credential_files(&CredentialEnv::default(), &targets).unwrap();

        let clasprc = fs::read_to_string(&targets.clasprc).unwrap();
        assert_eq!(clasprc, "{\n    \"token_type\": \"Bearer\"\n}");
        assert_eq!(fs::read_to_string(&targets.clasp_project).unwrap(), "{}");
    }
}
