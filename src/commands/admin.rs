//! One-shot operator commands: status, forced release pass, forced cleanup

use anyhow::Result;
use chrono::Utc;

use crate::config::Config;
use crate::models::ReleaseOutcome;
use crate::utils::{with_retry, RetryConfig};

use super::build_engine;

/// Print the current playlist state
pub async fn status(config: Config) -> Result<()> {
    let engine = build_engine(&config)?;

    // Reads are idempotent, so a transient store hiccup is retried
    let retry = RetryConfig::default();
    let snapshot = with_retry(&retry, || engine.status()).await?;

    println!("Playlist Status");
    println!("{:-<40}", "");
    match &snapshot.current {
        Some(playlist) => {
            println!("Open playlist: {} ({})", playlist.name, playlist.id);
            println!("Created: {}", playlist.created_at.to_rfc3339());
            println!("Items: {}", snapshot.open_items);
            println!(
                "Threshold: {}",
                engine.config().release_threshold_item_count
            );
        }
        None => println!("Open playlist: none"),
    }
    println!("Total playlists: {}", snapshot.total_playlists);

    Ok(())
}

/// Force one release evaluation pass (manual override)
pub async fn release(config: Config) -> Result<()> {
    let engine = build_engine(&config)?;
    engine.recover().await?;

    let outcomes = engine.evaluate_release(Utc::now()).await?;
    if outcomes.is_empty() {
        println!("No playlist is release-eligible yet");
        return Ok(());
    }

    for outcome in outcomes {
        match outcome {
            ReleaseOutcome::Released {
                playlist_id,
                item_count,
            } => println!("Released {playlist_id} with {item_count} items"),
            ReleaseOutcome::Deferred { playlist_id } => {
                println!("Deferred {playlist_id}: below item threshold")
            }
        }
    }

    Ok(())
}

/// Force one retention cleanup pass
pub async fn cleanup(config: Config) -> Result<()> {
    let engine = build_engine(&config)?;

    let removed = engine.cleanup(Utc::now()).await?;
    println!("Removed {removed} expired archived items");

    Ok(())
}
