//! Messages Cleaner
//!
//! Scheduled task that deletes tracked message ids older than the
//! retention window. Independent of recipient resolution.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::store::MessageStore;
use crate::config::CleanerConfig;
use crate::error::StoreError;

/// Periodic bulk delete of stale tracking records
pub struct MessagesCleaner {
    store: Arc<dyn MessageStore>,
    interval: Duration,
    retention: chrono::Duration,
}

impl MessagesCleaner {
    pub fn new(store: Arc<dyn MessageStore>, config: &CleanerConfig) -> Self {
        Self {
            store,
            interval: config.interval().max(Duration::from_secs(1)),
            retention: config.retention(),
        }
    }

    pub fn name(&self) -> &'static str {
        "kafka_messages_cleanup"
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn retention(&self) -> chrono::Duration {
        self.retention
    }

    /// Run one cleanup pass, returns count deleted
    pub async fn clean_once(&self) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - self.retention;
        let deleted = self.store.delete_older_than(cutoff).await?;

        if deleted > 0 {
            info!(task = self.name(), deleted = deleted, cutoff = %cutoff, "Deleted stale tracked messages");
        } else {
            debug!(task = self.name(), "No stale tracked messages to delete");
        }
        Ok(deleted)
    }

    /// Run until `shutdown` is cancelled. A failed pass is logged and the
    /// next tick tries again.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval(self.interval);
        info!(
            "Messages cleaner started, interval: {:?}, retention: {}h",
            self.interval,
            self.retention.num_hours()
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.clean_once().await {
                        warn!(task = self.name(), error = %e, "Messages cleanup failed");
                    }
                }
            }
        }

        info!("Messages cleaner stopped");
    }

    /// Spawn the cleaner as a background task
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
