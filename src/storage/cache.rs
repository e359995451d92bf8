//! Recipient Cache
//!
//! Keyed TTL store built on DashMap. Two regions, one for tenant-wide
//! lookups and one for group-scoped lookups, each with its own lifetime.
//!
//! Both regions share an invalidation epoch. Every entry remembers the
//! epoch it was written under and is only served while that epoch is
//! current, so bumping the epoch drops every entry of both regions in one
//! atomic step. A computation that started before an invalidation never
//! makes its result visible afterwards.

use dashmap::DashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::directory::User;
use crate::metrics::Metrics;

/// Expiry used when `now + ttl` does not fit the clock
const MAX_EXPIRY: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Assembled, ordered recipient list as stored in the cache
pub type Recipients = Arc<[User]>;

/// Key of a tenant-wide lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsersKey {
    pub tenant: String,
    pub admins_only: bool,
}

/// Key of a group-scoped lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupUsersKey {
    pub tenant: String,
    pub admins_only: bool,
    pub group_id: Uuid,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
    epoch: u64,
}

impl<V> Entry<V> {
    fn is_live(&self, epoch: u64) -> bool {
        self.epoch == epoch && Instant::now() < self.expires_at
    }
}

/// One named cache region with a fixed time-to-live
#[derive(Clone)]
pub struct CacheRegion<K, V> {
    name: &'static str,
    inner: Arc<DashMap<K, Entry<V>>>,
    ttl: Duration,
    epoch: Arc<AtomicU64>,
    metrics: Arc<Metrics>,
}

impl<K: Eq + Hash, V> fmt::Debug for CacheRegion<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegion")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("entries", &self.inner.len())
            .finish()
    }
}

impl<K, V> CacheRegion<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    fn new(name: &'static str, ttl: Duration, epoch: Arc<AtomicU64>, metrics: Arc<Metrics>) -> Self {
        let shard_amount = (num_cpus::get() * 4).next_power_of_two();
        Self {
            name,
            inner: Arc::new(DashMap::with_shard_amount(shard_amount)),
            ttl,
            epoch,
            metrics,
        }
    }

    /// Get a live value, `None` when absent, expired or invalidated
    #[inline]
    pub fn get(&self, key: &K) -> Option<V> {
        let epoch = self.epoch.load(Ordering::Acquire);
        self.inner.get(key).and_then(|entry| {
            if entry.is_live(epoch) {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    /// Store a value under the current epoch
    pub fn insert(&self, key: K, value: V) {
        let epoch = self.epoch.load(Ordering::Acquire);
        self.insert_at(key, value, epoch);
    }

    /// Store a value computed under `epoch`. Returns false, storing
    /// nothing, when an invalidation happened since.
    fn insert_at(&self, key: K, value: V, epoch: u64) -> bool {
        if self.epoch.load(Ordering::Acquire) != epoch {
            return false;
        }
        let now = Instant::now();
        let expires_at = now
            .checked_add(self.ttl)
            .unwrap_or_else(|| now + MAX_EXPIRY);
        let entry = Entry {
            value,
            expires_at,
            epoch,
        };
        self.inner.insert(key, entry);
        true
    }

    /// Return the live value for `key`, or run `compute`, store its
    /// result and return it. Errors are returned and never stored.
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let epoch = self.epoch.load(Ordering::Acquire);
        if let Some(value) = self.get(&key) {
            self.metrics.record_cache_hit();
            debug!(cache = self.name, key = ?key, "Cache hit");
            return Ok(value);
        }

        self.metrics.record_cache_miss();
        debug!(cache = self.name, key = ?key, "Cache miss");

        let value = compute().await?;
        if !self.insert_at(key.clone(), value.clone(), epoch) {
            debug!(cache = self.name, key = ?key, "Cache invalidated during computation, result not stored");
        }
        Ok(value)
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove expired and invalidated entries, returns count removed
    pub fn cleanup_expired(&self) -> usize {
        let epoch = self.epoch.load(Ordering::Acquire);
        let mut removed = 0;
        self.inner.retain(|_, entry| {
            if entry.is_live(epoch) {
                true
            } else {
                removed += 1;
                false
            }
        });
        removed
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

/// Both recipient cache regions and their shared invalidation epoch
#[derive(Debug, Clone)]
pub struct RecipientCache {
    users: CacheRegion<UsersKey, Recipients>,
    group_users: CacheRegion<GroupUsersKey, Recipients>,
    epoch: Arc<AtomicU64>,
}

impl RecipientCache {
    /// Hits and misses of both regions are counted in `metrics`
    pub fn new(users_ttl: Duration, group_users_ttl: Duration, metrics: Arc<Metrics>) -> Self {
        let epoch = Arc::new(AtomicU64::new(0));
        Self {
            users: CacheRegion::new("recipient-users", users_ttl, epoch.clone(), metrics.clone()),
            group_users: CacheRegion::new(
                "recipient-group-users",
                group_users_ttl,
                epoch.clone(),
                metrics,
            ),
            epoch,
        }
    }

    /// Tenant-wide lookups
    pub fn users(&self) -> &CacheRegion<UsersKey, Recipients> {
        &self.users
    }

    /// Group-scoped lookups
    pub fn group_users(&self) -> &CacheRegion<GroupUsersKey, Recipients> {
        &self.group_users
    }

    /// Drop every entry of both regions
    pub fn invalidate_all(&self) {
        let previous = self.epoch.fetch_add(1, Ordering::AcqRel);
        self.users.clear();
        self.group_users.clear();
        debug!(epoch = previous + 1, "Recipient caches invalidated");
    }

    /// Sweep both regions, returns count removed
    pub fn cleanup_expired(&self) -> usize {
        self.users.cleanup_expired() + self.group_users.cleanup_expired()
    }

    pub fn len(&self) -> usize {
        self.users.len() + self.group_users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.group_users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::numbered_users;
    use crate::error::RecipientError;

    fn users_key(tenant: &str) -> UsersKey {
        UsersKey {
            tenant: tenant.to_string(),
            admins_only: false,
        }
    }

    fn recipients(count: usize) -> Recipients {
        numbered_users(count).into()
    }

    fn cache_with_ttl(users_ttl: Duration, group_users_ttl: Duration) -> RecipientCache {
        RecipientCache::new(users_ttl, group_users_ttl, Arc::new(Metrics::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_compute_caches() {
        let metrics = Arc::new(Metrics::new());
        let cache = RecipientCache::new(Duration::from_secs(60), Duration::from_secs(60), metrics.clone());
        let region = cache.users();

        let first = region
            .get_or_compute(users_key("a"), || async { Ok::<_, RecipientError>(recipients(3)) })
            .await
            .unwrap();
        let second = region
            .get_or_compute(users_key("a"), || async { Ok::<_, RecipientError>(recipients(9)) })
            .await
            .unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);
        assert_eq!(metrics.cache_hits(), 1);
        assert_eq!(metrics.cache_misses(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiration() {
        let cache = cache_with_ttl(Duration::from_secs(10), Duration::from_secs(60));
        cache.users().insert(users_key("a"), recipients(1));
        assert!(cache.users().get(&users_key("a")).is_some());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.users().get(&users_key("a")).is_none());
        assert_eq!(cache.cleanup_expired(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_regions_have_independent_ttl() {
        let cache = cache_with_ttl(Duration::from_secs(10), Duration::from_secs(100));
        let group_key = GroupUsersKey {
            tenant: "a".to_string(),
            admins_only: false,
            group_id: Uuid::new_v4(),
        };
        cache.users().insert(users_key("a"), recipients(1));
        cache.group_users().insert(group_key.clone(), recipients(2));

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(cache.users().get(&users_key("a")).is_none());
        assert_eq!(cache.group_users().get(&group_key).map(|r| r.len()), Some(2));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = cache_with_ttl(Duration::from_secs(60), Duration::from_secs(60));
        let region = cache.users();

        let err = region
            .get_or_compute(users_key("a"), || async {
                Err::<Recipients, _>(RecipientError::DirectoryUnavailable("down".to_string()))
            })
            .await;
        assert!(err.is_err());
        assert!(region.is_empty());

        let ok = region
            .get_or_compute(users_key("a"), || async { Ok::<_, RecipientError>(recipients(2)) })
            .await
            .unwrap();
        assert_eq!(ok.len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_clears_both_regions() {
        let cache = cache_with_ttl(Duration::from_secs(60), Duration::from_secs(60));
        let group_key = GroupUsersKey {
            tenant: "a".to_string(),
            admins_only: true,
            group_id: Uuid::new_v4(),
        };
        cache.users().insert(users_key("a"), recipients(1));
        cache.users().insert(users_key("b"), recipients(1));
        cache.group_users().insert(group_key.clone(), recipients(1));

        cache.invalidate_all();

        assert!(cache.users().get(&users_key("a")).is_none());
        assert!(cache.users().get(&users_key("b")).is_none());
        assert!(cache.group_users().get(&group_key).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalidation_during_compute_is_not_repopulated() {
        let cache = cache_with_ttl(Duration::from_secs(60), Duration::from_secs(60));
        let region = cache.users().clone();
        let invalidator = cache.clone();

        let value = region
            .get_or_compute(users_key("a"), || async move {
                invalidator.invalidate_all();
                Ok::<_, RecipientError>(recipients(4))
            })
            .await
            .unwrap();

        assert_eq!(value.len(), 4);
        assert!(region.get(&users_key("a")).is_none());
        assert!(region.is_empty());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = cache_with_ttl(Duration::from_secs(60), Duration::from_secs(60));
        cache.users().insert(users_key("a"), recipients(1));
        cache.users().insert(users_key("a"), recipients(5));
        assert_eq!(cache.users().get(&users_key("a")).map(|r| r.len()), Some(5));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_does_not_overflow() {
        let cache = cache_with_ttl(Duration::MAX, Duration::from_secs(u64::MAX));
        let group_key = GroupUsersKey {
            tenant: "a".to_string(),
            admins_only: false,
            group_id: Uuid::new_v4(),
        };
        cache.users().insert(users_key("a"), recipients(2));
        cache.group_users().insert(group_key.clone(), recipients(3));

        tokio::time::advance(Duration::from_secs(365 * 24 * 60 * 60)).await;
        assert_eq!(cache.users().get(&users_key("a")).map(|r| r.len()), Some(2));
        assert_eq!(cache.group_users().get(&group_key).map(|r| r.len()), Some(3));
        assert_eq!(cache.cleanup_expired(), 0);
    }

    #[test]
    fn test_region_debug_output() {
        let cache = cache_with_ttl(Duration::from_secs(5), Duration::from_secs(7));
        cache.users().insert(users_key("a"), recipients(1));

        let rendered = format!("{:?}", cache);
        assert!(rendered.contains("recipient-users"));
        assert!(rendered.contains("recipient-group-users"));
        assert!(rendered.contains("entries: 1"));
    }
}
