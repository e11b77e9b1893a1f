//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Prints the effective configuration as TOML, literal secrets redacted.
pub fn dump(config: &ClientConfig, source: Option<&Path>) -> ClientResult<u8> {
    println!("{}", render(config, source)?);
    Ok(0)
}

/// Shows which configuration file is in use.
pub fn path(source: Option<&Path>) -> ClientResult<u8> {
    match source {
        Some(path) => println!("config: {}", path.display()),
        None => {
            println!("config: none (defaults and environment only)");
            for candidate in ClientConfig::default_paths() {
                println!("  looked for {}", candidate.display());
            }
        }
    }
    Ok(0)
}

fn render(config: &ClientConfig, source: Option<&Path>) -> ClientResult<String> {
    let body = toml::to_string_pretty(&config.redacted())
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    let header = match source {
        Some(path) => format!("# addonctl.toml ({})", path.display()),
        None => "# addonctl.toml (not found, defaults and environment)".to_string(),
    };
    Ok(format!("{}\n{}", header, body))
}
