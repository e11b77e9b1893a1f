//! Secret values in `addonctl.toml`.
//!
//! A secret setting may hold the value itself or point somewhere else:
//!
//! - `env::NAME` reads the environment variable `NAME`
//! - `pass::entry` takes the first line of `pass show entry`
//!
//! Anything else is used verbatim.

use std::process::Command;

/// Shown by `config dump` in place of a literal secret.
pub const REDACTED: &str = "<redacted>";

/// A parsed secret setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Literal(&'a str),
    Env(&'a str),
    Pass(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(name) = value.strip_prefix("env::") {
            Self::Env(name)
        } else if let Some(entry) = value.strip_prefix("pass::") {
            Self::Pass(entry)
        } else {
            Self::Literal(value)
        }
    }

    /// Returns the secret itself.
    pub fn resolve(&self) -> Result<String, String> {
        match self {
            Self::Literal(value) => Ok((*value).to_string()),
            Self::Env(name) => std::env::var(name)
                .map_err(|_| format!("environment variable `{}` is not set", name)),
            Self::Pass(entry) => pass_show(entry),
        }
    }

    /// Returns a form safe to print: references as written, literals hidden.
    pub fn display_safe(&self) -> String {
        match self {
            Self::Literal(_) => REDACTED.to_string(),
            Self::Env(name) => format!("env::{}", name),
            Self::Pass(entry) => format!("pass::{}", entry),
        }
    }
}

/// Resolves a secret setting.
pub fn resolve(value: &str) -> Result<String, String> {
    SecretRef::parse(value).resolve()
}

fn pass_show(entry: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .args(["show", entry])
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", entry, e))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            entry,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` printed nothing", entry))
}
