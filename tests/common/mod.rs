//! Common test utilities

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tapedeck::config::EngineConfig;
use tapedeck::engine::PlaylistEngine;
use tapedeck::models::{NewItem, Playlist};
use tapedeck::notifier::MockNotifier;
use tapedeck::publisher::MockPublisher;
use tapedeck::store::{EntryStore, MockEntryStore};

/// Engine wired to in-memory collaborators, all handles kept for assertions
pub struct TestEngine {
    pub store: Arc<MockEntryStore>,
    pub publisher: Arc<MockPublisher>,
    pub notifier: Arc<MockNotifier>,
    pub engine: Arc<PlaylistEngine>,
}

/// Fast lifecycle settings: one hour to release, three items required
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        release_interval_hours: 1,
        release_check_interval_minutes: 1,
        release_threshold_item_count: 3,
        retention_window_hours: 24,
        cleanup_interval_hours: 1,
        publish_timeout_secs: 5,
    }
}

/// Build an engine over mock store, publisher, and notifier
pub fn build_test_engine() -> TestEngine {
    let store = Arc::new(MockEntryStore::new());
    let publisher = Arc::new(MockPublisher::new());
    let notifier = Arc::new(MockNotifier::new());

    let engine = Arc::new(PlaylistEngine::new(
        store.clone(),
        publisher.clone(),
        notifier.clone(),
        test_engine_config(),
    ));

    TestEngine {
        store,
        publisher,
        notifier,
        engine,
    }
}

/// Insert an open playlist created `age` ago
#[allow(dead_code)]
pub async fn seed_playlist(store: &MockEntryStore, id: &str, age: Duration) -> Playlist {
    let created = Utc::now() - age;
    let playlist = Playlist {
        id: id.to_string(),
        name: Playlist::volume_name(1),
        released: false,
        created_at: created,
        updated_at: created,
    };
    store.insert_playlist(&playlist).await.unwrap();
    playlist
}

/// Insert an item row directly, bypassing the publisher
#[allow(dead_code)]
pub async fn seed_item(
    store: &MockEntryStore,
    video_id: &str,
    playlist_id: &str,
    created_at: DateTime<Utc>,
) {
    store
        .insert_item(NewItem {
            video_id: video_id.to_string(),
            playlist_id: playlist_id.to_string(),
            remote_ref: format!("ref-{video_id}"),
            created_at,
        })
        .await
        .unwrap();
}
