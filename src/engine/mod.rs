//! Playlist lifecycle engine
//!
//! The engine owns every lifecycle decision: which playlist is currently
//! open, whether an add or remove is legal, whether release criteria are
//! met, how a release transitions state across the two stored collections,
//! and how retention cleanup runs. It is the only writer of the entry
//! store; the scheduler and command router go through its operations.
//!
//! # Ordering guarantees
//!
//! - The check-and-create path for the open playlist runs under a mutex,
//!   so concurrent submissions with no open playlist create exactly one.
//! - Adds and removes for the *same* video id are serialized against each
//!   other; distinct ids proceed concurrently.
//! - Adds and removes hold a shared phase lock that the release transition
//!   takes exclusively, so an in-flight add can never land its row in a
//!   playlist that a concurrent release pass has just marked released.
//! - Release is a two-phase sequence (mark released, then archive items)
//!   with an idempotent startup repair ([`PlaylistEngine::recover`]) that
//!   finishes the archival if the process died between the phases.
//! - Every remote publisher call runs under an explicit deadline; on
//!   timeout the local store is not mutated, preserving the "no local
//!   record implies no remote attachment" contract relied on by removes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::{Item, NewItem, Playlist, ReleaseOutcome};
use crate::notifier::Notifier;
use crate::publisher::RemotePublisher;
use crate::store::EntryStore;

/// Snapshot of the engine's persisted state (status command)
#[derive(Debug, Clone)]
pub struct EngineStatus {
    /// The currently open playlist, if any
    pub current: Option<Playlist>,
    /// Non-archived items in the open playlist
    pub open_items: usize,
    /// Playlists ever created, released ones included
    pub total_playlists: usize,
}

/// The playlist lifecycle engine
pub struct PlaylistEngine {
    store: Arc<dyn EntryStore>,
    publisher: Arc<dyn RemotePublisher>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
    /// Serializes the open-playlist check-and-create path
    open_lock: Mutex<()>,
    /// Item mutations take this shared; the release state transition takes
    /// it exclusive, so neither can interleave with the other
    phase_lock: RwLock<()>,
    /// Per-video-id locks serializing add/remove of the same id
    item_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PlaylistEngine {
    /// Create an engine over the given collaborators
    pub fn new(
        store: Arc<dyn EntryStore>,
        publisher: Arc<dyn RemotePublisher>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            notifier,
            config,
            open_lock: Mutex::new(()),
            phase_lock: RwLock::new(()),
            item_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    fn item_lock(&self, video_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.item_locks.lock().unwrap();
        locks
            .entry(video_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop a video id's lock entry once no task holds or awaits it.
    /// Cloning only happens under the map mutex held here, so a strong
    /// count of two (the map's and ours) proves we are the last user.
    fn retire_item_lock(&self, video_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.item_locks.lock().unwrap();
        if Arc::strong_count(&lock) == 2 {
            locks.remove(video_id);
        }
    }

    /// Run a remote publisher call under the configured deadline.
    /// A timeout is a failure, never an assumed success.
    async fn with_deadline<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        match tokio::time::timeout(self.config.publish_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout { operation }),
        }
    }

    /// Resolve the open playlist, creating one if none exists.
    ///
    /// Holds the creation lock for the whole check-and-create sequence so
    /// overlapping invocations cannot both observe "none open". If more
    /// than one open playlist exists (anomalous), the most recently
    /// created one is returned and the anomaly is logged; the engine does
    /// not auto-repair duplicate-open state, it only avoids making it
    /// worse.
    pub async fn ensure_open_playlist(&self, now: DateTime<Utc>) -> Result<Playlist> {
        let _guard = self.open_lock.lock().await;

        let open = self.store.open_playlists().await?;
        if open.len() > 1 {
            warn!(
                count = open.len(),
                "multiple unreleased playlists exist; using the most recent"
            );
        }
        if let Some(current) = open.into_iter().next() {
            return Ok(current);
        }

        let sequence = self.store.count_playlists().await? + 1;
        let name = Playlist::volume_name(sequence);
        let id = self
            .with_deadline("create_playlist", self.publisher.create_playlist(&name))
            .await?;

        let playlist = Playlist {
            id,
            name,
            released: false,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_playlist(&playlist).await?;

        info!(playlist_id = %playlist.id, name = %playlist.name, "opened new playlist");
        Ok(playlist)
    }

    /// Add a submitted video to the open playlist.
    ///
    /// The remote attach happens first; the local row is only written
    /// once the publisher returned a handle.
    pub async fn add_item(&self, video_id: &str, now: DateTime<Utc>) -> Result<Item> {
        let lock = self.item_lock(video_id);
        let guard = lock.lock().await;
        let result = self.add_item_locked(video_id, now).await;
        drop(guard);
        self.retire_item_lock(video_id, lock);
        result
    }

    async fn add_item_locked(&self, video_id: &str, now: DateTime<Utc>) -> Result<Item> {
        // Shared phase: the playlist resolved here cannot be released out
        // from under us before the row lands
        let _phase = self.phase_lock.read().await;

        let playlist = self.ensure_open_playlist(now).await?;

        let remote_ref = self
            .with_deadline(
                "attach_item",
                self.publisher.attach_item(&playlist.id, video_id),
            )
            .await?;

        let item = self
            .store
            .insert_item(NewItem {
                video_id: video_id.to_string(),
                playlist_id: playlist.id.clone(),
                remote_ref,
                created_at: now,
            })
            .await?;

        info!(
            video_id = %video_id,
            playlist_id = %playlist.id,
            item_id = %item.id,
            "item added"
        );
        Ok(item)
    }

    /// Remove the most recent non-archived submission of a video.
    ///
    /// Returns [`Error::NotFound`] without any publisher call when no
    /// matching row exists. On a failed remote detach the local row is
    /// deliberately left intact: no orphaned remote state without a local
    /// record.
    pub async fn remove_item(&self, video_id: &str) -> Result<()> {
        let lock = self.item_lock(video_id);
        let guard = lock.lock().await;
        let result = self.remove_item_locked(video_id).await;
        drop(guard);
        self.retire_item_lock(video_id, lock);
        result
    }

    async fn remove_item_locked(&self, video_id: &str) -> Result<()> {
        let _phase = self.phase_lock.read().await;

        let item = self
            .store
            .latest_unarchived_item(video_id)
            .await?
            .ok_or(Error::NotFound)?;

        self.with_deadline("detach_item", self.publisher.detach_item(&item.remote_ref))
            .await?;

        self.store.delete_item(item.id).await?;

        info!(video_id = %video_id, item_id = %item.id, "item removed");
        Ok(())
    }

    /// Evaluate release eligibility for every open playlist.
    ///
    /// A playlist is eligible once its age reaches the release interval;
    /// it is released only if it also holds at least the threshold item
    /// count. `updated_at` is refreshed for every eligible playlist even
    /// when the outcome is deferred. Multiple eligible playlists (the
    /// duplicate-open anomaly) are processed independently in the same
    /// pass; a failure on one is logged and does not stop the others.
    pub async fn evaluate_release(&self, now: DateTime<Utc>) -> Result<Vec<ReleaseOutcome>> {
        let open = self.store.open_playlists().await?;
        let due: Vec<Playlist> = open
            .into_iter()
            .filter(|p| now - p.created_at >= self.config.release_interval())
            .collect();

        if due.len() > 1 {
            warn!(
                count = due.len(),
                "multiple unreleased playlists are release-eligible; processing each independently"
            );
        }

        let mut outcomes = Vec::with_capacity(due.len());
        for playlist in due {
            match self.evaluate_one(&playlist, now).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(
                    playlist_id = %playlist.id,
                    error = %e,
                    "release evaluation failed; retrying next tick"
                ),
            }
        }
        Ok(outcomes)
    }

    async fn evaluate_one(
        &self,
        playlist: &Playlist,
        now: DateTime<Utc>,
    ) -> Result<ReleaseOutcome> {
        // Exclusive phase: waits out in-flight adds and removes, and blocks
        // new ones, for the whole count-and-transition window. Dropped
        // before the announcement and the successor creation, which do not
        // touch the released playlist's rows.
        let phase = self.phase_lock.write().await;

        self.store.touch_playlist(&playlist.id, now).await?;

        let count = self.store.count_unarchived_items(&playlist.id).await?;
        if count < self.config.release_threshold_item_count {
            debug!(
                playlist_id = %playlist.id,
                items = count,
                threshold = self.config.release_threshold_item_count,
                "release deferred: below item threshold"
            );
            return Ok(ReleaseOutcome::Deferred {
                playlist_id: playlist.id.clone(),
            });
        }

        // Representative item for the announcement: the oldest submission,
        // read before the bulk archive clears the unarchived set.
        let representative = self
            .store
            .unarchived_video_ids(&playlist.id)
            .await?
            .into_iter()
            .next();

        self.store.mark_released(&playlist.id).await?;
        let archived = self.store.archive_items(&playlist.id).await?;
        drop(phase);

        info!(
            playlist_id = %playlist.id,
            name = %playlist.name,
            items = archived,
            "playlist released"
        );

        if let Err(e) = self
            .notifier
            .announce(&playlist.name, representative.as_deref(), count)
            .await
        {
            warn!(playlist_id = %playlist.id, error = %e, "release announcement failed");
        }

        self.ensure_open_playlist(now).await?;

        Ok(ReleaseOutcome::Released {
            playlist_id: playlist.id.clone(),
            item_count: count,
        })
    }

    /// Delete archived items older than the retention window.
    /// Never touches playlists or non-archived items.
    pub async fn cleanup(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - self.config.retention_window();
        let removed = self.store.delete_archived_before(cutoff).await?;

        if removed > 0 {
            info!(removed = removed, "retired expired archived items");
        } else {
            debug!("retention cleanup found nothing to retire");
        }
        Ok(removed)
    }

    /// Startup repair: finish the archival of any playlist that was
    /// marked released but whose items were never archived (a crash
    /// between the two release phases). Idempotent; returns the number
    /// of items archived.
    pub async fn recover(&self) -> Result<usize> {
        let pending = self.store.partially_archived_playlists().await?;
        let mut repaired = 0;

        for playlist in pending {
            let archived = self.store.archive_items(&playlist.id).await?;
            warn!(
                playlist_id = %playlist.id,
                items = archived,
                "completed interrupted release archival"
            );
            repaired += archived;
        }
        Ok(repaired)
    }

    /// Snapshot of persisted state for the status command
    pub async fn status(&self) -> Result<EngineStatus> {
        let open = self.store.open_playlists().await?;
        let current = open.into_iter().next();

        let open_items = match &current {
            Some(playlist) => self.store.count_unarchived_items(&playlist.id).await?,
            None => 0,
        };
        let total_playlists = self.store.count_playlists().await?;

        Ok(EngineStatus {
            current,
            open_items,
            total_playlists,
        })
    }

    /// Engine configuration in effect
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
