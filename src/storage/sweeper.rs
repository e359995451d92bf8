//! Cache Sweeper
//!
//! Background task that periodically removes expired entries from the
//! recipient cache. Expiry is enforced on read; sweeping only bounds memory.

use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::RecipientCache;

/// Background sweep task for RecipientCache
pub struct CacheSweeper {
    cache: RecipientCache,
    interval: Duration,
}

impl CacheSweeper {
    /// Create a new sweeper
    pub fn new(cache: RecipientCache, interval_secs: u64) -> Self {
        Self {
            cache,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Run until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval(self.interval);
        info!("Cache sweeper started, interval: {:?}", self.interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = self.cache.cleanup_expired();
                    if removed > 0 {
                        debug!(removed = removed, "Swept expired cache entries");
                    }
                }
            }
        }

        info!("Cache sweeper stopped");
    }

    /// Spawn the sweeper as a background task
    pub fn spawn(
        cache: RecipientCache,
        interval_secs: u64,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let sweeper = Self::new(cache, interval_secs);
        tokio::spawn(sweeper.run(shutdown))
    }
}
