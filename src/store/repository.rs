//! Repository abstraction over the entry store
//!
//! Trait-based storage so the engine can run against SQLite in production
//! and an in-memory mock in tests:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             Playlist Engine                 │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │               EntryStore                    │
//! └─────────────────────────────────────────────┘
//!            │                     │
//!            ▼                     ▼
//! ┌─────────────────┐   ┌─────────────────┐
//! │     SQLite      │   │      Mock       │
//! │ Implementation  │   │ Implementation  │
//! └─────────────────┘   └─────────────────┘
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{Item, NewItem, Playlist};

// ============================================================================
// Repository Trait
// ============================================================================

/// Storage contract for items and playlists
///
/// Every method is a potential suspension point; callers must assume other
/// engine operations can interleave between calls.
#[async_trait]
pub trait EntryStore: Send + Sync {
    // --- items ---

    /// Insert an item; the store assigns and returns the row id
    async fn insert_item(&self, item: NewItem) -> Result<Item>;

    /// Most recent non-archived item with the given external video id
    async fn latest_unarchived_item(&self, video_id: &str) -> Result<Option<Item>>;

    /// Delete one item row; returns whether a row existed
    async fn delete_item(&self, id: i64) -> Result<bool>;

    /// Count non-archived items belonging to a playlist
    async fn count_unarchived_items(&self, playlist_id: &str) -> Result<usize>;

    /// Mark every item of a playlist archived (single bulk call);
    /// returns the number of rows changed
    async fn archive_items(&self, playlist_id: &str) -> Result<usize>;

    /// Video ids of a playlist's non-archived items, oldest first
    async fn unarchived_video_ids(&self, playlist_id: &str) -> Result<Vec<String>>;

    /// Delete archived items created before the cutoff; returns removed count
    async fn delete_archived_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    // --- playlists ---

    /// Persist a freshly created playlist
    async fn insert_playlist(&self, playlist: &Playlist) -> Result<()>;

    /// All unreleased playlists, most recently created first
    async fn open_playlists(&self) -> Result<Vec<Playlist>>;

    /// Flip a playlist's released flag; returns whether a row existed
    async fn mark_released(&self, playlist_id: &str) -> Result<bool>;

    /// Refresh a playlist's updated_at timestamp
    async fn touch_playlist(&self, playlist_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Total number of playlists ever created (sequential naming)
    async fn count_playlists(&self) -> Result<usize>;

    /// Released playlists that still have non-archived items
    /// (interrupted releases awaiting startup repair)
    async fn partially_archived_playlists(&self) -> Result<Vec<Playlist>>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of [`EntryStore`]
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteEntryStore {
    conn: Mutex<Connection>,
}

impl SqliteEntryStore {
    /// Open (or create) a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better concurrency between the two event sources
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite entry store initialized");
        Ok(store)
    }

    /// Create in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    video_id TEXT NOT NULL,
                    playlist_id TEXT NOT NULL,
                    remote_ref TEXT NOT NULL,
                    archived INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_items_video
                    ON items(video_id, archived);

                CREATE INDEX IF NOT EXISTS idx_items_playlist
                    ON items(playlist_id, archived);

                CREATE TABLE IF NOT EXISTS playlists (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    released INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_playlists_released
                    ON playlists(released);
                "#,
        )?;

        Ok(())
    }
}

/// A timestamp that no longer parses means the row is damaged; surfacing
/// the error beats fabricating a time that cleanup would compare against.
fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        video_id: row.get(1)?,
        playlist_id: row.get(2)?,
        remote_ref: row.get(3)?,
        archived: row.get::<_, i64>(4)? != 0,
        created_at: parse_ts(5, row.get::<_, String>(5)?)?,
    })
}

fn row_to_playlist(row: &rusqlite::Row<'_>) -> rusqlite::Result<Playlist> {
    Ok(Playlist {
        id: row.get(0)?,
        name: row.get(1)?,
        released: row.get::<_, i64>(2)? != 0,
        created_at: parse_ts(3, row.get::<_, String>(3)?)?,
        updated_at: parse_ts(4, row.get::<_, String>(4)?)?,
    })
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn insert_item(&self, item: NewItem) -> Result<Item> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
                INSERT INTO items (video_id, playlist_id, remote_ref, archived, created_at)
                VALUES (?1, ?2, ?3, 0, ?4)
                "#,
            params![
                item.video_id,
                item.playlist_id,
                item.remote_ref,
                item.created_at.to_rfc3339()
            ],
        )?;

        let id = conn.last_insert_rowid();
        Ok(Item {
            id,
            video_id: item.video_id,
            playlist_id: item.playlist_id,
            remote_ref: item.remote_ref,
            archived: false,
            created_at: item.created_at,
        })
    }

    async fn latest_unarchived_item(&self, video_id: &str) -> Result<Option<Item>> {
        let conn = self.conn.lock().unwrap();
        let item = conn
            .query_row(
                r#"
                SELECT id, video_id, playlist_id, remote_ref, archived, created_at
                FROM items
                WHERE video_id = ?1 AND archived = 0
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                "#,
                params![video_id],
                row_to_item,
            )
            .optional()?;

        Ok(item)
    }

    async fn delete_item(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    async fn count_unarchived_items(&self, playlist_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE playlist_id = ?1 AND archived = 0",
            params![playlist_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn archive_items(&self, playlist_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE items SET archived = 1 WHERE playlist_id = ?1 AND archived = 0",
            params![playlist_id],
        )?;
        Ok(changed)
    }

    async fn unarchived_video_ids(&self, playlist_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT video_id FROM items
            WHERE playlist_id = ?1 AND archived = 0
            ORDER BY created_at ASC, id ASC
            "#,
        )?;

        let ids = stmt
            .query_map(params![playlist_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ids)
    }

    async fn delete_archived_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM items WHERE archived = 1 AND created_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(removed)
    }

    async fn insert_playlist(&self, playlist: &Playlist) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
                INSERT INTO playlists (id, name, released, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            params![
                playlist.id,
                playlist.name,
                playlist.released as i64,
                playlist.created_at.to_rfc3339(),
                playlist.updated_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    async fn open_playlists(&self) -> Result<Vec<Playlist>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, released, created_at, updated_at
            FROM playlists
            WHERE released = 0
            ORDER BY created_at DESC
            "#,
        )?;

        let playlists = stmt
            .query_map([], row_to_playlist)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(playlists)
    }

    async fn mark_released(&self, playlist_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE playlists SET released = 1 WHERE id = ?1",
            params![playlist_id],
        )?;
        Ok(changed > 0)
    }

    async fn touch_playlist(&self, playlist_id: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE playlists SET updated_at = ?2 WHERE id = ?1",
            params![playlist_id, at.to_rfc3339()],
        )?;
        Ok(())
    }

    async fn count_playlists(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM playlists", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn partially_archived_playlists(&self) -> Result<Vec<Playlist>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT p.id, p.name, p.released, p.created_at, p.updated_at
            FROM playlists p
            WHERE p.released = 1
              AND EXISTS (
                  SELECT 1 FROM items i
                  WHERE i.playlist_id = p.id AND i.archived = 0
              )
            ORDER BY p.created_at ASC
            "#,
        )?;

        let playlists = stmt
            .query_map([], row_to_playlist)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(playlists)
    }
}

// ============================================================================
// Mock Implementation (for testing)
// ============================================================================

#[derive(Default)]
struct MockInner {
    items: HashMap<i64, Item>,
    playlists: HashMap<String, Playlist>,
    next_item_id: i64,
}

/// In-memory mock implementation of [`EntryStore`]
///
/// Useful for engine tests without database dependencies.
#[derive(Default)]
pub struct MockEntryStore {
    inner: RwLock<MockInner>,
}

impl MockEntryStore {
    /// Create a new mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of item rows currently stored
    pub fn item_count(&self) -> usize {
        self.inner.read().unwrap().items.len()
    }

    /// Number of playlist rows currently stored
    pub fn playlist_count(&self) -> usize {
        self.inner.read().unwrap().playlists.len()
    }

    /// Snapshot of a playlist row (test assertions)
    pub fn playlist(&self, id: &str) -> Option<Playlist> {
        self.inner.read().unwrap().playlists.get(id).cloned()
    }

    /// Snapshot of every item row (test assertions)
    pub fn items(&self) -> Vec<Item> {
        let mut items: Vec<_> = self.inner.read().unwrap().items.values().cloned().collect();
        items.sort_by_key(|i| i.id);
        items
    }
}

#[async_trait]
impl EntryStore for MockEntryStore {
    async fn insert_item(&self, item: NewItem) -> Result<Item> {
        let mut inner = self.inner.write().unwrap();
        inner.next_item_id += 1;
        let id = inner.next_item_id;

        let stored = Item {
            id,
            video_id: item.video_id,
            playlist_id: item.playlist_id,
            remote_ref: item.remote_ref,
            archived: false,
            created_at: item.created_at,
        };
        inner.items.insert(id, stored.clone());
        Ok(stored)
    }

    async fn latest_unarchived_item(&self, video_id: &str) -> Result<Option<Item>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .items
            .values()
            .filter(|i| i.video_id == video_id && !i.archived)
            .max_by_key(|i| (i.created_at, i.id))
            .cloned())
    }

    async fn delete_item(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.items.remove(&id).is_some())
    }

    async fn count_unarchived_items(&self, playlist_id: &str) -> Result<usize> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .items
            .values()
            .filter(|i| i.playlist_id == playlist_id && !i.archived)
            .count())
    }

    async fn archive_items(&self, playlist_id: &str) -> Result<usize> {
        let mut inner = self.inner.write().unwrap();
        let mut changed = 0;
        for item in inner.items.values_mut() {
            if item.playlist_id == playlist_id && !item.archived {
                item.archived = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn unarchived_video_ids(&self, playlist_id: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().unwrap();
        let mut items: Vec<_> = inner
            .items
            .values()
            .filter(|i| i.playlist_id == playlist_id && !i.archived)
            .collect();
        items.sort_by_key(|i| (i.created_at, i.id));
        Ok(items.into_iter().map(|i| i.video_id.clone()).collect())
    }

    async fn delete_archived_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut inner = self.inner.write().unwrap();
        let doomed: Vec<i64> = inner
            .items
            .values()
            .filter(|i| i.archived && i.created_at < cutoff)
            .map(|i| i.id)
            .collect();
        for id in &doomed {
            inner.items.remove(id);
        }
        Ok(doomed.len())
    }

    async fn insert_playlist(&self, playlist: &Playlist) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.playlists.contains_key(&playlist.id) {
            return Err(Error::store(anyhow::anyhow!(
                "duplicate playlist id {}",
                playlist.id
            )));
        }
        inner.playlists.insert(playlist.id.clone(), playlist.clone());
        Ok(())
    }

    async fn open_playlists(&self) -> Result<Vec<Playlist>> {
        let inner = self.inner.read().unwrap();
        let mut open: Vec<_> = inner
            .playlists
            .values()
            .filter(|p| !p.released)
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(open)
    }

    async fn mark_released(&self, playlist_id: &str) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        match inner.playlists.get_mut(playlist_id) {
            Some(playlist) => {
                playlist.released = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_playlist(&self, playlist_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        if let Some(playlist) = inner.playlists.get_mut(playlist_id) {
            playlist.updated_at = at;
        }
        Ok(())
    }

    async fn count_playlists(&self) -> Result<usize> {
        let inner = self.inner.read().unwrap();
        Ok(inner.playlists.len())
    }

    async fn partially_archived_playlists(&self) -> Result<Vec<Playlist>> {
        let inner = self.inner.read().unwrap();
        let mut pending: Vec<_> = inner
            .playlists
            .values()
            .filter(|p| {
                p.released
                    && inner
                        .items
                        .values()
                        .any(|i| i.playlist_id == p.id && !i.archived)
            })
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }
}

// ============================================================================
// Shared Store Types
// ============================================================================

/// Thread-safe shared store handle
pub type SharedEntryStore = Arc<dyn EntryStore>;

/// Create a shared SQLite store
pub fn create_sqlite_store(path: impl AsRef<Path>) -> Result<SharedEntryStore> {
    let store = SqliteEntryStore::open(path)?;
    Ok(Arc::new(store))
}

// ============================================================================
// Tests
// ============================================================================
