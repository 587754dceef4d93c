use std::time::Duration;

use anyhow::Result;
use calverge_core::orchestrator::Orchestrator;
use calverge_core::store::LocalStore;
use calverge_core::sync_config::SyncConfiguration;
use tokio_util::sync::CancellationToken;

use crate::render::Render;
use crate::utils::tui;

pub async fn run(store: &LocalStore, config: &SyncConfiguration, timeout: Duration) -> Result<()> {
    let cancel = CancellationToken::new();

    // First Ctrl-C stops after the current source; a second one kills the process.
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current source");
            watcher.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });

    let orchestrator = Orchestrator::new(store)
        .with_access_timeout(timeout)
        .with_cancellation(cancel);

    let spinner = tui::create_spinner(format!("Syncing {}", config.display_name()));
    let result = orchestrator.run_sync(config).await;
    spinner.finish_and_clear();

    let report = result?;
    println!("{}", report.render());

    Ok(())
}
