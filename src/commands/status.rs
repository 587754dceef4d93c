use std::time::Duration;

use anyhow::Result;
use calverge_core::orchestrator::Orchestrator;
use calverge_core::store::LocalStore;
use calverge_core::sync_config::SyncConfiguration;

use crate::render::Render;
use crate::utils::tui;

pub async fn run(store: &LocalStore, config: &SyncConfiguration, timeout: Duration) -> Result<()> {
    let orchestrator = Orchestrator::new(store).with_access_timeout(timeout);

    let spinner = tui::create_spinner(format!("Checking {}", config.display_name()));
    let result = orchestrator.status(config).await;
    spinner.finish_and_clear();

    println!("{}", result?.render());

    Ok(())
}
