//! Podmirror entry point.
//!
//! Wires configuration, logging, the store, the Pocket Casts connector and
//! the sync coordinator together, then runs one full mirror pass over an
//! in-process task queue. This is the "manual backup trigger"; a scheduler
//! invoking the same binary is the other one.

use anyhow::Context;
use core_library::{create_pool, initialize_store, DatabaseConfig};
use core_runtime::{init_logging, CoreConfig, LoggingConfig};
use core_sync::{LocalTaskQueue, SyncConfig, SyncCoordinator};
use provider_pocketcasts::{PocketCastsConnector, ReqwestHttpClient};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default()).context("Failed to initialize logging")?;

    let config = CoreConfig::from_env().context("Failed to load configuration")?;

    info!(
        database = %config.database_path.display(),
        api = %config.api_base_url,
        "Starting full mirror pass"
    );

    let pool = create_pool(DatabaseConfig::new(&config.database_path))
        .await
        .context("Failed to open database")?;
    initialize_store(&pool).await?;

    let http_client = Arc::new(ReqwestHttpClient::new());
    let service = Arc::new(PocketCastsConnector::new(
        http_client,
        &config.api_base_url,
        &config.cache_base_url,
    ));

    let (queue, mut receiver) = LocalTaskQueue::new();
    let sync_config =
        SyncConfig::new(&config.access_token).max_task_batch(config.max_task_batch);
    let coordinator = SyncCoordinator::new(sync_config, service, Arc::new(queue), pool);

    let run_id = coordinator.start_full_sync().await?;
    let stats = coordinator.run_to_completion(&mut receiver).await;

    info!(
        run_id = %run_id,
        handled = stats.handled,
        failed = stats.failed,
        "Mirror pass finished"
    );

    if stats.failed > 0 {
        anyhow::bail!("{} unit(s) of work failed; rerun to retry", stats.failed);
    }

    Ok(())
}
