//! The long-running service command

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

use crate::config::Config;
use crate::scheduler::EngineScheduler;

use super::build_engine;

/// Start the engine: run startup repair, make sure a playlist is open,
/// then drive the scheduler until ctrl-c.
pub async fn run(config: Config) -> Result<()> {
    let engine = build_engine(&config)?;

    // Idempotent repair before any timer fires: finish archival for
    // playlists whose release was interrupted by a crash
    let repaired = engine.recover().await?;
    if repaired > 0 {
        tracing::info!(items = repaired, "startup repair archived leftover items");
    }

    engine.ensure_open_playlist(Utc::now()).await?;

    let scheduler = Arc::new(EngineScheduler::new(engine));
    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.start().await })
    };

    tracing::info!("tapedeck running; press ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("shutdown signal received");
    scheduler.stop().await;
    runner.await.context("Scheduler task panicked")?;

    Ok(())
}
