//! File-backed SQLite store tests
//!
//! In-memory behavior is covered next to the store module; these tests
//! exercise the on-disk path, including restarts.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use tapedeck::models::{NewItem, Playlist};
use tapedeck::store::{EntryStore, SqliteEntryStore};
use tempfile::TempDir;

fn playlist(id: &str) -> Playlist {
    let now = Utc::now();
    Playlist {
        id: id.to_string(),
        name: Playlist::volume_name(1),
        released: false,
        created_at: now,
        updated_at: now,
    }
}

fn item(video_id: &str, playlist_id: &str) -> NewItem {
    NewItem {
        video_id: video_id.to_string(),
        playlist_id: playlist_id.to_string(),
        remote_ref: format!("ref-{video_id}"),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("tapedeck.db");

    {
        let store = SqliteEntryStore::open(&path).unwrap();
        store.insert_playlist(&playlist("pl-1")).await.unwrap();
        store.insert_item(item("v1", "pl-1")).await.unwrap();
    }

    let store = SqliteEntryStore::open(&path).unwrap();
    assert_eq!(store.count_playlists().await.unwrap(), 1);

    let found = store.latest_unarchived_item("v1").await.unwrap().unwrap();
    assert_eq!(found.remote_ref, "ref-v1");
    assert_eq!(found.playlist_id, "pl-1");
}

#[tokio::test]
async fn test_item_ids_stay_unique_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tapedeck.db");

    let first_id = {
        let store = SqliteEntryStore::open(&path).unwrap();
        store.insert_playlist(&playlist("pl-1")).await.unwrap();
        let inserted = store.insert_item(item("v1", "pl-1")).await.unwrap();
        store.delete_item(inserted.id).await.unwrap();
        inserted.id
    };

    let store = SqliteEntryStore::open(&path).unwrap();
    let second = store.insert_item(item("v2", "pl-1")).await.unwrap();
    assert_ne!(second.id, first_id);
}

#[tokio::test]
async fn test_released_flag_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tapedeck.db");

    {
        let store = SqliteEntryStore::open(&path).unwrap();
        store.insert_playlist(&playlist("pl-1")).await.unwrap();
        store.mark_released("pl-1").await.unwrap();
    }

    let store = SqliteEntryStore::open(&path).unwrap();
    assert!(store.open_playlists().await.unwrap().is_empty());
    assert_eq!(store.count_playlists().await.unwrap(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Retention cleanup removes exactly the archived rows past the cutoff
    /// and never touches an unarchived row, whatever its age.
    #[test]
    fn cleanup_never_deletes_unarchived_rows(
        rows in prop::collection::vec((any::<bool>(), 0i64..2000), 0..40)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let store = SqliteEntryStore::in_memory().unwrap();
            let now = Utc::now();
            let cutoff = now - Duration::hours(24);

            let mut expected_removed = 0;
            let mut unarchived: Vec<String> = Vec::new();

            for (i, (archived, age_hours)) in rows.iter().enumerate() {
                let video_id = format!("v{i}");
                let created = now - Duration::hours(*age_hours);
                store
                    .insert_item(NewItem {
                        video_id: video_id.clone(),
                        playlist_id: format!("pl{i}"),
                        remote_ref: format!("ref-{video_id}"),
                        created_at: created,
                    })
                    .await
                    .unwrap();

                if *archived {
                    store.archive_items(&format!("pl{i}")).await.unwrap();
                    if created < cutoff {
                        expected_removed += 1;
                    }
                } else {
                    unarchived.push(video_id);
                }
            }

            let removed = store.delete_archived_before(cutoff).await.unwrap();
            assert_eq!(removed, expected_removed);

            for video_id in unarchived {
                assert!(
                    store
                        .latest_unarchived_item(&video_id)
                        .await
                        .unwrap()
                        .is_some(),
                    "unarchived item {video_id} must survive cleanup"
                );
            }
        });
    }
}
