//! Credential file generation.

use std::path::{Path, PathBuf};

use addonctl_auth::generate::{CredentialEnv, CredentialTargets, generate_credential_files};

use crate::error::ClientResult;

/// Writes the credential files a CI job needs from environment variables.
pub fn generate(dir: &Path, clasprc: Option<PathBuf>) -> ClientResult<u8> {
    let mut targets = CredentialTargets::in_dir(dir)?;
    if let Some(path) = clasprc {
        targets.clasprc = path;
    }

    let written = generate_credential_files(&CredentialEnv::from_env(), &targets)?;
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(0)
}
