//! Periodic driver for the engine's two timed actions
//!
//! Runs release checks and retention cleanup at configurable intervals.
//! A tick never aborts the loop: engine errors are logged and the driver
//! waits for the next interval. Overlapping work is safe because the
//! engine serializes its own critical sections.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::PlaylistEngine;

/// Scheduler status information
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub release_check_interval_secs: u64,
    pub cleanup_interval_secs: u64,
}

/// Interval-driven runtime shell around [`PlaylistEngine`]
pub struct EngineScheduler {
    engine: Arc<PlaylistEngine>,
    release_check_interval: Duration,
    cleanup_interval: Duration,
    is_running: Arc<RwLock<bool>>,
}

impl EngineScheduler {
    /// Create a scheduler using the engine's configured intervals
    pub fn new(engine: Arc<PlaylistEngine>) -> Self {
        let release_check_interval = engine.config().release_check_interval();
        let cleanup_interval = engine.config().cleanup_interval();

        Self {
            engine,
            release_check_interval,
            cleanup_interval,
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Run the periodic loop until [`stop`](Self::stop) is called
    pub async fn start(&self) {
        *self.is_running.write().await = true;
        info!(
            release_check_secs = self.release_check_interval.as_secs(),
            cleanup_secs = self.cleanup_interval.as_secs(),
            "scheduler started"
        );

        let now = Instant::now();
        let mut release_ticks = interval_at(now + self.release_check_interval, self.release_check_interval);
        let mut cleanup_ticks = interval_at(now + self.cleanup_interval, self.cleanup_interval);
        release_ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        cleanup_ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while *self.is_running.read().await {
            tokio::select! {
                _ = release_ticks.tick() => {
                    self.run_release_check().await;
                }
                _ = cleanup_ticks.tick() => {
                    self.run_cleanup().await;
                }
                _ = self.wait_for_stop() => {
                    break;
                }
            }
        }

        info!("scheduler stopped");
    }

    /// Stop the periodic loop
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
    }

    /// Check if the scheduler is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get scheduler status
    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            is_running: self.is_running().await,
            release_check_interval_secs: self.release_check_interval.as_secs(),
            cleanup_interval_secs: self.cleanup_interval.as_secs(),
        }
    }

    async fn wait_for_stop(&self) {
        loop {
            if !*self.is_running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn run_release_check(&self) {
        debug!("release check tick");
        match self.engine.evaluate_release(Utc::now()).await {
            Ok(outcomes) if outcomes.is_empty() => {}
            Ok(outcomes) => info!(outcomes = outcomes.len(), "release check completed"),
            Err(e) => warn!(error = %e, "release check failed; waiting for next tick"),
        }
    }

    async fn run_cleanup(&self) {
        debug!("retention cleanup tick");
        match self.engine.cleanup(Utc::now()).await {
            Ok(removed) => debug!(removed = removed, "retention cleanup completed"),
            Err(e) => warn!(error = %e, "retention cleanup failed; waiting for next tick"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::notifier::MockNotifier;
    use crate::publisher::MockPublisher;
    use crate::store::MockEntryStore;

    fn scheduler() -> EngineScheduler {
        let engine = Arc::new(PlaylistEngine::new(
            Arc::new(MockEntryStore::new()),
            Arc::new(MockPublisher::new()),
            Arc::new(MockNotifier::new()),
            EngineConfig {
                release_interval_hours: 1,
                release_check_interval_minutes: 1,
                release_threshold_item_count: 3,
                retention_window_hours: 24,
                cleanup_interval_hours: 1,
                publish_timeout_secs: 5,
            },
        ));
        EngineScheduler::new(engine)
    }

    #[tokio::test]
    async fn test_scheduler_not_running_initially() {
        let scheduler = scheduler();
        assert!(!scheduler.is_running().await);
    }

    #[tokio::test]
    async fn test_scheduler_intervals_from_config() {
        let scheduler = scheduler();
        let status = scheduler.status().await;
        assert_eq!(status.release_check_interval_secs, 60);
        assert_eq!(status.cleanup_interval_secs, 3600);
        assert!(!status.is_running);
    }

    #[tokio::test]
    async fn test_scheduler_start_and_stop() {
        let scheduler = Arc::new(scheduler());

        let runner = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.start().await })
        };

        // Let the loop spin up, then stop it
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.is_running().await);

        scheduler.stop().await;
        runner.await.unwrap();
        assert!(!scheduler.is_running().await);
    }
}
