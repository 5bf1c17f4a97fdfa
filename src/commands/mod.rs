//! CLI command handlers

pub mod admin;
pub mod run;

// Re-export command functions for convenience
pub use admin::{cleanup, release, status};
pub use run::run;

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::PlaylistEngine;
use crate::notifier::{Notifier, NullNotifier, WebhookNotifier};
use crate::publisher::HttpPublisher;
use crate::store::create_sqlite_store;

/// Construct the engine and its collaborators from configuration
pub fn build_engine(config: &Config) -> Result<Arc<PlaylistEngine>> {
    config.validate()?;

    let store = create_sqlite_store(&config.database.sqlite_path)?;

    let publisher = Arc::new(HttpPublisher::new(
        &config.publisher,
        config.engine.publish_timeout(),
    )?);

    let notifier: Arc<dyn Notifier> = if config.notifier.webhook_url.is_empty() {
        Arc::new(NullNotifier)
    } else {
        Arc::new(WebhookNotifier::new((&config.notifier).into())?)
    };

    Ok(Arc::new(PlaylistEngine::new(
        store,
        publisher,
        notifier,
        config.engine.clone(),
    )))
}
