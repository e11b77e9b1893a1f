//! Releasing the add-on.
//!
//! - [`clasp`]: script versions through the clasp CLI
//! - [`manifest`]: stamping the store manifest
//! - [`archive`]: zipping the package directory
//! - [`store`]: Chrome Web Store upload and publish
//! - [`pipeline`]: the ordered release steps
//! - [`script`]: running the in-script test suite through the Apps Script API

pub mod archive;
pub mod clasp;
pub mod config;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod script;
pub mod store;

pub use archive::zip_directory;
pub use clasp::{ClaspRunner, VersionId};
pub use config::{ClaspSettings, DeployConfig, TestConfig};
pub use error::{DeployError, DeployResult};
pub use manifest::ManifestPatcher;
pub use pipeline::{
    AccessToken, DeployContext, ItemStore, Pipeline, RefreshTokenSource, Step, TokenSource,
    VersionControl,
};
pub use script::{ScriptFailure, ScriptOutcome, ScriptRunner, StackFrame};
pub use store::StoreClient;
