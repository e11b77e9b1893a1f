//! The release pipeline.
//!
//! A release is a fixed list of [`Step`]s run in order by one driver loop.
//! Each step reads the [`DeployContext`] built so far and returns an extended
//! copy; the first failure stops the run. Nothing is rolled back.

use std::fmt;
use std::path::PathBuf;

use addonctl_auth::{Credentials, OAuthClient};
use addonctl_core::BoxFuture;
use tracing::{error, info};

use crate::archive::zip_directory;
use crate::clasp::{ClaspRunner, VersionId};
use crate::config::DeployConfig;
use crate::error::{DeployError, DeployResult};
use crate::manifest::ManifestPatcher;
use crate::store::StoreClient;

/// A short-lived bearer token for the store API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Creates and deploys script versions.
pub trait VersionControl: Send + Sync {
    fn create_version(&self) -> BoxFuture<'_, DeployResult<VersionId>>;

    fn deploy_version<'a>(&'a self, version: &'a VersionId) -> BoxFuture<'a, DeployResult<VersionId>>;
}

/// Mints access tokens for the store.
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> BoxFuture<'_, DeployResult<AccessToken>>;
}

/// Receives and publishes packages.
pub trait ItemStore: Send + Sync {
    fn upload<'a>(
        &'a self,
        token: &'a AccessToken,
        app_id: &'a str,
        package: Vec<u8>,
    ) -> BoxFuture<'a, DeployResult<()>>;

    fn publish<'a>(&'a self, token: &'a AccessToken, app_id: &'a str) -> BoxFuture<'a, DeployResult<()>>;
}

impl VersionControl for ClaspRunner {
    fn create_version(&self) -> BoxFuture<'_, DeployResult<VersionId>> {
        Box::pin(ClaspRunner::create_version(self))
    }

    fn deploy_version<'a>(&'a self, version: &'a VersionId) -> BoxFuture<'a, DeployResult<VersionId>> {
        Box::pin(ClaspRunner::deploy_version(self, version))
    }
}

impl ItemStore for StoreClient {
    fn upload<'a>(
        &'a self,
        token: &'a AccessToken,
        app_id: &'a str,
        package: Vec<u8>,
    ) -> BoxFuture<'a, DeployResult<()>> {
        Box::pin(StoreClient::upload(self, token.secret(), app_id, package))
    }

    fn publish<'a>(&'a self, token: &'a AccessToken, app_id: &'a str) -> BoxFuture<'a, DeployResult<()>> {
        Box::pin(StoreClient::publish(self, token.secret(), app_id))
    }
}

/// Exchanges a long-lived refresh token for an access token on every call.
#[derive(Debug, Clone)]
pub struct RefreshTokenSource {
    oauth: OAuthClient,
    refresh_token: String,
}

impl RefreshTokenSource {
    pub fn new(oauth: OAuthClient, refresh_token: impl Into<String>) -> Self {
        Self {
            oauth,
            refresh_token: refresh_token.into(),
        }
    }
}

impl TokenSource for RefreshTokenSource {
    fn access_token(&self) -> BoxFuture<'_, DeployResult<AccessToken>> {
        Box::pin(async move {
            let token = self.oauth.refresh_access_token(&self.refresh_token).await?;
            Ok(AccessToken::new(token))
        })
    }
}

/// One stage of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreateVersion,
    DeployVersion,
    PatchManifest,
    ArchiveDirectory,
    RefreshToken,
    Upload,
    Publish,
}

impl Step {
    /// Every step, in execution order.
    pub const ALL: [Step; 7] = [
        Step::CreateVersion,
        Step::DeployVersion,
        Step::PatchManifest,
        Step::ArchiveDirectory,
        Step::RefreshToken,
        Step::Upload,
        Step::Publish,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::CreateVersion => "create-version",
            Step::DeployVersion => "deploy-version",
            Step::PatchManifest => "patch-manifest",
            Step::ArchiveDirectory => "archive-directory",
            Step::RefreshToken => "refresh-token",
            Step::Upload => "upload",
            Step::Publish => "publish",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Step::CreateVersion => "creating script version",
            Step::DeployVersion => "deploying script version",
            Step::PatchManifest => "patching store manifest",
            Step::ArchiveDirectory => "archiving package directory",
            Step::RefreshToken => "refreshing store access token",
            Step::Upload => "uploading package",
            Step::Publish => "publishing item",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the steps have produced so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployContext {
    version: Option<VersionId>,
    deployed: bool,
    manifest_patched: bool,
    archive: Option<PathBuf>,
    access_token: Option<AccessToken>,
}

impl DeployContext {
    pub fn version(&self) -> Option<&VersionId> {
        self.version.as_ref()
    }

    pub fn is_deployed(&self) -> bool {
        self.deployed
    }

    pub fn is_manifest_patched(&self) -> bool {
        self.manifest_patched
    }

    pub fn archive(&self) -> Option<&PathBuf> {
        self.archive.as_ref()
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn with_version(&self, version: VersionId) -> Self {
        Self {
            version: Some(version),
            ..self.clone()
        }
    }

    pub fn with_deployed(&self) -> Self {
        Self {
            deployed: true,
            ..self.clone()
        }
    }

    pub fn with_manifest_patched(&self) -> Self {
        Self {
            manifest_patched: true,
            ..self.clone()
        }
    }

    pub fn with_archive(&self, archive: PathBuf) -> Self {
        Self {
            archive: Some(archive),
            ..self.clone()
        }
    }

    pub fn with_access_token(&self, token: AccessToken) -> Self {
        Self {
            access_token: Some(token),
            ..self.clone()
        }
    }

    fn require_version(&self, step: Step) -> DeployResult<&VersionId> {
        self.version.as_ref().ok_or(DeployError::StepOrder {
            step: step.name(),
            missing: "script version",
        })
    }

    fn require_archive(&self, step: Step) -> DeployResult<&PathBuf> {
        self.archive.as_ref().ok_or(DeployError::StepOrder {
            step: step.name(),
            missing: "archive",
        })
    }

    fn require_token(&self, step: Step) -> DeployResult<&AccessToken> {
        self.access_token.as_ref().ok_or(DeployError::StepOrder {
            step: step.name(),
            missing: "access token",
        })
    }
}

/// The release pipeline with its collaborators.
pub struct Pipeline<V, T, S> {
    config: DeployConfig,
    manifest: ManifestPatcher,
    vcs: V,
    tokens: T,
    store: S,
}

impl Pipeline<ClaspRunner, RefreshTokenSource, StoreClient> {
    /// Wires the production collaborators from a validated config.
    pub fn from_config(config: DeployConfig) -> DeployResult<Self> {
        config.validate()?;

        let vcs = ClaspRunner::new(&config.clasp);
        let credentials = Credentials::new(&config.client_id, &config.client_secret)
            .with_token_uri(&config.token_uri);
        let oauth = OAuthClient::new(credentials, config.http_timeout)?;
        let tokens = RefreshTokenSource::new(oauth, &config.refresh_token);
        let store = StoreClient::with_base_urls(
            &config.store_upload_base,
            &config.store_api_base,
            config.http_timeout,
        )?;

        Ok(Self::new(config, vcs, tokens, store))
    }
}

impl<V, T, S> Pipeline<V, T, S>
where
    V: VersionControl,
    T: TokenSource,
    S: ItemStore,
{
    pub fn new(config: DeployConfig, vcs: V, tokens: T, store: S) -> Self {
        let manifest = ManifestPatcher::new(&config.manifest_path, &config.description_template);
        Self {
            config,
            manifest,
            vcs,
            tokens,
            store,
        }
    }

    /// Runs every step and maps the outcome to a process exit code.
    pub async fn run(&self) -> u8 {
        match self.execute().await {
            Ok(_) => 0,
            Err(_) => 1,
        }
    }

    /// Runs every step in order, stopping at the first failure.
    pub async fn execute(&self) -> DeployResult<DeployContext> {
        let mut context = DeployContext::default();
        let total = Step::ALL.len();

        for (index, step) in Step::ALL.into_iter().enumerate() {
            info!(step = step.name(), "[{}/{}] {}", index + 1, total, step.description());
            context = match self.run_step(step, &context).await {
                Ok(next) => next,
                Err(e) => {
                    error!(step = step.name(), "{}", e);
                    return Err(e);
                }
            };
        }

        if let Some(version) = context.version() {
            info!("released version {}", version);
        }
        Ok(context)
    }

    /// Runs a single step against `context`.
    pub async fn run_step(&self, step: Step, context: &DeployContext) -> DeployResult<DeployContext> {
        match step {
            Step::CreateVersion => {
                let version = self.vcs.create_version().await?;
                info!("created version {}", version);
                Ok(context.with_version(version))
            }
            Step::DeployVersion => {
                let version = context.require_version(step)?;
                self.vcs.deploy_version(version).await?;
                Ok(context.with_deployed())
            }
            Step::PatchManifest => {
                let version = context.require_version(step)?;
                self.manifest.patch(version)?;
                Ok(context.with_manifest_patched())
            }
            Step::ArchiveDirectory => {
                let count =
                    zip_directory(&self.config.archive_dir, &self.config.archive_file).await?;
                info!("archived {} files into {:?}", count, self.config.archive_file);
                Ok(context.with_archive(self.config.archive_file.clone()))
            }
            Step::RefreshToken => {
                let token = self.tokens.access_token().await?;
                Ok(context.with_access_token(token))
            }
            Step::Upload => {
                let archive = context.require_archive(step)?;
                let token = context.require_token(step)?;
                let package = tokio::fs::read(archive).await.map_err(|e| {
                    DeployError::io(format!("failed to read archive {:?}", archive), e)
                })?;
                self.store.upload(token, &self.config.app_id, package).await?;
                Ok(context.clone())
            }
            Step::Publish => {
                let token = context.require_token(step)?;
                self.store.publish(token, &self.config.app_id).await?;
                Ok(context.clone())
            }
        }
    }
}
