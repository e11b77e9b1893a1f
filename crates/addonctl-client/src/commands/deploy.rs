//! Release command.

use addonctl_deploy::Pipeline;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Runs the release pipeline.
///
/// Settings are validated before any step runs. Step failures are logged by
/// the pipeline itself and only show up here as exit code 1.
pub async fn run(config: &ClientConfig) -> ClientResult<u8> {
    let deploy_config = config.deploy_config()?;
    info!(
        "releasing {} from {:?}",
        deploy_config.app_id, deploy_config.archive_dir
    );

    let pipeline = Pipeline::from_config(deploy_config)?;
    Ok(pipeline.run().await)
}
