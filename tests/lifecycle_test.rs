//! End-to-end lifecycle tests: submissions through the command router,
//! release evaluation, retention cleanup, and startup recovery.

mod common;

use chrono::{Duration, Utc};
use common::{build_test_engine, seed_item, seed_playlist};
use tapedeck::config::ChatConfig;
use tapedeck::models::{ReactionKind, ReleaseOutcome};
use tapedeck::publisher::PublisherCall;
use tapedeck::router::CommandRouter;
use tapedeck::store::EntryStore;

fn chat_config(channels: &[&str]) -> ChatConfig {
    ChatConfig {
        command_prefix: "!".to_string(),
        active_channels: channels.iter().map(|c| c.to_string()).collect(),
    }
}

#[tokio::test]
async fn test_first_submission_bootstraps_playlist() {
    let fixture = build_test_engine();
    let router = CommandRouter::new(fixture.engine.clone(), chat_config(&[]));

    let reaction = router
        .dispatch("chan-1", "!add https://youtu.be/dQw4w9WgXcQ")
        .await;

    assert_eq!(reaction, Some(ReactionKind::Success));
    assert_eq!(fixture.store.playlist_count(), 1);
    assert_eq!(fixture.store.item_count(), 1);

    let calls = fixture.publisher.calls();
    assert!(matches!(&calls[0], PublisherCall::CreatePlaylist { name } if name == "Mixtape Vol. 1"));
    assert!(matches!(
        &calls[1],
        PublisherCall::AttachItem { video_id, .. } if video_id == "dQw4w9WgXcQ"
    ));
}

#[tokio::test]
async fn test_full_release_cycle() {
    let fixture = build_test_engine();
    let now = Utc::now();

    let playlist = seed_playlist(&fixture.store, "pl-old", Duration::hours(2)).await;
    for video in ["v1-aaaaaa", "v2-bbbbbb", "v3-cccccc"] {
        fixture.engine.add_item(video, now).await.unwrap();
    }

    let outcomes = fixture.engine.evaluate_release(now).await.unwrap();
    assert_eq!(
        outcomes,
        vec![ReleaseOutcome::Released {
            playlist_id: playlist.id.clone(),
            item_count: 3,
        }]
    );

    // Every item archived, playlist marked released
    assert!(fixture.store.items().iter().all(|i| i.archived));
    assert!(fixture.store.playlist(&playlist.id).unwrap().released);

    // A successor was opened with the next volume number
    let status = fixture.engine.status().await.unwrap();
    let successor = status.current.unwrap();
    assert_ne!(successor.id, playlist.id);
    assert_eq!(successor.name, "Mixtape Vol. 2");
    assert_eq!(status.open_items, 0);

    // Announcement carries the oldest submission as representative
    let announcements = fixture.notifier.announcements();
    assert_eq!(announcements.len(), 1);
    assert_eq!(announcements[0].playlist_name, playlist.name);
    assert_eq!(announcements[0].representative.as_deref(), Some("v1-aaaaaa"));
    assert_eq!(announcements[0].item_count, 3);
}

#[tokio::test]
async fn test_deferred_until_threshold_met() {
    let fixture = build_test_engine();
    let now = Utc::now();

    let playlist = seed_playlist(&fixture.store, "pl-old", Duration::hours(2)).await;
    fixture.engine.add_item("v1-aaaaaa", now).await.unwrap();
    fixture.engine.add_item("v2-bbbbbb", now).await.unwrap();

    let outcomes = fixture.engine.evaluate_release(now).await.unwrap();
    assert_eq!(
        outcomes,
        vec![ReleaseOutcome::Deferred {
            playlist_id: playlist.id.clone(),
        }]
    );
    assert!(!fixture.store.playlist(&playlist.id).unwrap().released);

    // The deferred pass refreshed updated_at
    let touched = fixture.store.playlist(&playlist.id).unwrap();
    assert!(touched.updated_at > playlist.updated_at);

    // One more submission crosses the threshold
    fixture.engine.add_item("v3-cccccc", now).await.unwrap();
    let outcomes = fixture.engine.evaluate_release(now).await.unwrap();
    assert!(matches!(
        outcomes[0],
        ReleaseOutcome::Released { item_count: 3, .. }
    ));
}

#[tokio::test]
async fn test_released_playlist_is_never_reevaluated() {
    let fixture = build_test_engine();
    let now = Utc::now();

    seed_playlist(&fixture.store, "pl-old", Duration::hours(2)).await;
    for video in ["v1-aaaaaa", "v2-bbbbbb", "v3-cccccc"] {
        fixture.engine.add_item(video, now).await.unwrap();
    }
    fixture.engine.evaluate_release(now).await.unwrap();

    // The successor is young, so a second pass does nothing
    let outcomes = fixture.engine.evaluate_release(now).await.unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(fixture.notifier.announcements().len(), 1);
}

#[tokio::test]
async fn test_duplicate_submission_remove_targets_newest() {
    let fixture = build_test_engine();
    let now = Utc::now();

    seed_playlist(&fixture.store, "pl-1", Duration::minutes(5)).await;
    let first = fixture
        .engine
        .add_item("v1-aaaaaa", now - Duration::minutes(2))
        .await
        .unwrap();
    let second = fixture.engine.add_item("v1-aaaaaa", now).await.unwrap();

    fixture.engine.remove_item("v1-aaaaaa").await.unwrap();

    let remaining = fixture.store.items();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, first.id);

    let detached: Vec<_> = fixture
        .publisher
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            PublisherCall::DetachItem { remote_ref } => Some(remote_ref),
            _ => None,
        })
        .collect();
    assert_eq!(detached, vec![second.remote_ref]);
}

#[tokio::test]
async fn test_remove_unknown_video_makes_no_publisher_call() {
    let fixture = build_test_engine();
    let router = CommandRouter::new(fixture.engine.clone(), chat_config(&[]));

    let reaction = router.dispatch("chan-1", "!remove v1-aaaaaa").await;

    assert_eq!(reaction, Some(ReactionKind::NotFound));
    assert_eq!(fixture.publisher.call_count(), 0);
}

#[tokio::test]
async fn test_inactive_channel_is_ignored() {
    let fixture = build_test_engine();
    let router = CommandRouter::new(fixture.engine.clone(), chat_config(&["chan-music"]));

    let reaction = router
        .dispatch("chan-offtopic", "!add https://youtu.be/dQw4w9WgXcQ")
        .await;

    assert_eq!(reaction, None);
    assert_eq!(fixture.publisher.call_count(), 0);
    assert_eq!(fixture.store.item_count(), 0);
}

#[tokio::test]
async fn test_cleanup_retires_only_expired_archived_items() {
    let fixture = build_test_engine();
    let now = Utc::now();

    seed_playlist(&fixture.store, "pl-released", Duration::days(10)).await;
    seed_item(
        &fixture.store,
        "expired",
        "pl-released",
        now - Duration::days(10),
    )
    .await;
    seed_item(
        &fixture.store,
        "recent",
        "pl-released",
        now - Duration::hours(1),
    )
    .await;
    fixture.store.archive_items("pl-released").await.unwrap();

    // Old but never archived: immune to cleanup
    seed_playlist(&fixture.store, "pl-open", Duration::days(10)).await;
    seed_item(&fixture.store, "open-old", "pl-open", now - Duration::days(10)).await;

    // Retention window is 24h in the test config
    let removed = fixture.engine.cleanup(now).await.unwrap();
    assert_eq!(removed, 1);

    let survivors: Vec<_> = fixture
        .store
        .items()
        .into_iter()
        .map(|i| i.video_id)
        .collect();
    assert!(survivors.contains(&"recent".to_string()));
    assert!(survivors.contains(&"open-old".to_string()));
    assert!(!survivors.contains(&"expired".to_string()));
}

#[tokio::test]
async fn test_recovery_completes_interrupted_release() {
    let fixture = build_test_engine();
    let now = Utc::now();

    seed_playlist(&fixture.store, "pl-1", Duration::hours(2)).await;
    seed_item(&fixture.store, "v1-aaaaaa", "pl-1", now).await;
    seed_item(&fixture.store, "v2-bbbbbb", "pl-1", now).await;

    // Crash between the two release phases: released flag set,
    // items never archived
    fixture.store.mark_released("pl-1").await.unwrap();

    let repaired = fixture.engine.recover().await.unwrap();
    assert_eq!(repaired, 2);
    assert!(fixture.store.items().iter().all(|i| i.archived));

    // Idempotent on a clean store
    assert_eq!(fixture.engine.recover().await.unwrap(), 0);
}
