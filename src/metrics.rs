//! Basic Metrics
//!
//! Lookup counters, cache hits and misses, directory traffic and latency
//! tracking.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector
#[derive(Debug)]
pub struct Metrics {
    /// Total lookups served
    total_lookups: AtomicU64,

    /// Lookups per kind ("users", "group-users")
    lookups_by_kind: RwLock<HashMap<String, u64>>,

    /// Lookups that ended in an error
    failed_lookups: AtomicU64,

    /// Cache hits and misses over both cache regions
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,

    /// Page requests sent to the directory
    page_requests: AtomicU64,

    /// Latency tracking (simplified)
    latency_sum_us: AtomicU64,
    latency_count: AtomicU64,
    latency_min_us: AtomicU64,
    latency_max_us: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            total_lookups: AtomicU64::new(0),
            lookups_by_kind: RwLock::new(HashMap::new()),
            failed_lookups: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            page_requests: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            latency_min_us: AtomicU64::new(u64::MAX),
            latency_max_us: AtomicU64::new(0),
        }
    }

    /// Record a completed lookup
    pub fn record_lookup(&self, kind: &str, latency: Duration, success: bool) {
        self.total_lookups.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_lookups.fetch_add(1, Ordering::Relaxed);
        }

        *self
            .lookups_by_kind
            .write()
            .entry(kind.to_string())
            .or_insert(0) += 1;

        let latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        self.latency_min_us.fetch_min(latency_us, Ordering::Relaxed);
        self.latency_max_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one page request sent to the directory
    pub fn record_page_request(&self) {
        self.page_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_lookups(&self) -> u64 {
        self.total_lookups.load(Ordering::Relaxed)
    }

    pub fn failed_lookups(&self) -> u64 {
        self.failed_lookups.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn page_requests(&self) -> u64 {
        self.page_requests.load(Ordering::Relaxed)
    }

    /// Get lookups by kind
    pub fn lookups_by_kind(&self) -> HashMap<String, u64> {
        self.lookups_by_kind.read().clone()
    }

    /// Get average latency in microseconds
    pub fn avg_latency_us(&self) -> f64 {
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        sum as f64 / count as f64
    }

    /// Get min latency in microseconds
    pub fn min_latency_us(&self) -> u64 {
        let min = self.latency_min_us.load(Ordering::Relaxed);
        if min == u64::MAX {
            0
        } else {
            min
        }
    }

    /// Get max latency in microseconds
    pub fn max_latency_us(&self) -> u64 {
        self.latency_max_us.load(Ordering::Relaxed)
    }

    /// Get a summary of metrics
    pub fn summary(&self) -> String {
        format!(
            "Lookups: {} ({} failed) | Cache: {} hits, {} misses | Directory pages: {} | Latency (µs): avg={:.1}, min={}, max={}",
            self.total_lookups(),
            self.failed_lookups(),
            self.cache_hits(),
            self.cache_misses(),
            self.page_requests(),
            self.avg_latency_us(),
            self.min_latency_us(),
            self.max_latency_us()
        )
    }
}
