use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use calverge_core::calendar::CalendarRef;
use calverge_core::orchestrator::Orchestrator;
use calverge_core::store::LocalStore;
use owo_colors::OwoColorize;

use crate::render::Render;

pub async fn run(store: &LocalStore, timeout: Duration) -> Result<()> {
    let calendars = Orchestrator::new(store)
        .with_access_timeout(timeout)
        .calendars()
        .await?;

    if calendars.is_empty() {
        println!(
            "No calendars found in {}",
            store.root().display().to_string().dimmed()
        );
        return Ok(());
    }

    let mut by_source: BTreeMap<&str, Vec<&CalendarRef>> = BTreeMap::new();
    for calendar in &calendars {
        by_source.entry(&calendar.source).or_default().push(calendar);
    }

    for (i, (source, calendars)) in by_source.iter().enumerate() {
        println!("{}", source.bold());
        for calendar in calendars {
            println!("   {}", calendar.render());
        }

        if i < by_source.len() - 1 {
            println!();
        }
    }

    Ok(())
}
