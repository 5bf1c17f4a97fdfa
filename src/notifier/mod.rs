//! Release announcements
//!
//! When a playlist is released the engine announces it (name, representative
//! item, item count) through this seam. Delivery is best effort: a failed
//! announcement is logged and never rolls back the release.

mod webhook;

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::Result;

pub use webhook::{WebhookConfig, WebhookNotifier};

/// Chat-surface announcement seam consumed by the engine
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce a released playlist
    async fn announce(
        &self,
        playlist_name: &str,
        representative: Option<&str>,
        item_count: usize,
    ) -> Result<()>;
}

/// Notifier that only logs; used when no webhook is configured
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn announce(
        &self,
        playlist_name: &str,
        representative: Option<&str>,
        item_count: usize,
    ) -> Result<()> {
        tracing::info!(
            playlist = %playlist_name,
            representative = ?representative,
            item_count = %item_count,
            "release announcement (no channel configured)"
        );
        Ok(())
    }
}

/// One recorded announcement (test assertions)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub playlist_name: String,
    pub representative: Option<String>,
    pub item_count: usize,
}

/// Recording notifier for tests, with a scriptable failure switch
#[derive(Default)]
pub struct MockNotifier {
    announcements: Mutex<Vec<Announcement>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MockNotifier {
    /// Create a mock that accepts every announcement
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent announcements fail
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// All recorded announcements, in order
    pub fn announcements(&self) -> Vec<Announcement> {
        self.announcements.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn announce(
        &self,
        playlist_name: &str,
        representative: Option<&str>,
        item_count: usize,
    ) -> Result<()> {
        self.announcements.lock().unwrap().push(Announcement {
            playlist_name: playlist_name.to_string(),
            representative: representative.map(String::from),
            item_count,
        });

        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(crate::error::Error::publish_unavailable(
                "scripted announcement failure",
            ));
        }
        Ok(())
    }
}
