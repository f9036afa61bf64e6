//! Expiring key/value store.
//!
//! Each entry records when it was written and is valid while
//! `now - created_at <= ttl`. Expired entries are invisible to [`get`] but
//! stay readable through [`get_stale`] until `moka` reclaims them after the
//! retention window, so a failed recomputation can still serve the last
//! good value.
//!
//! Time comes from an injected [`Clock`] so expiry can be tested without
//! sleeping.
//!
//! [`get`]: ExpiringCache::get
//! [`get_stale`]: ExpiringCache::get_stale

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use moka::future::Cache;

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A stored value and its write time.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: DateTime<Utc>,
}

/// Thread-safe store whose entries expire independently.
///
/// Concurrent writes to the same key are last-write-wins. There is no
/// capacity bound.
#[derive(Clone)]
pub struct ExpiringCache<K, V> {
    entries: Cache<K, CacheEntry<V>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl<K, V> fmt::Debug for ExpiringCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a store.
    ///
    /// `retention` bounds how long expired entries remain available to
    /// [`get_stale`](Self::get_stale); it is never shorter than `ttl`.
    #[must_use]
    pub fn new(ttl: Duration, retention: Duration, clock: Arc<dyn Clock>) -> Self {
        let entries = Cache::builder()
            .time_to_live(retention.max(ttl))
            .build();

        Self {
            entries,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    /// Current time according to the store's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Whether an entry is past its time-to-live.
    #[must_use]
    pub fn is_expired(&self, entry: &CacheEntry<V>) -> bool {
        self.clock.now().signed_duration_since(entry.created_at) > self.ttl
    }

    /// Get a valid value. Expired entries read as absent.
    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .await
            .filter(|entry| !self.is_expired(entry))
            .map(|entry| entry.value)
    }

    /// Get an entry whether or not it has expired.
    pub async fn get_stale(&self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.get(key).await
    }

    /// Store a value, replacing any previous entry for the key.
    pub async fn put(&self, key: K, value: V) {
        let entry = CacheEntry {
            value,
            created_at: self.clock.now(),
        };
        self.entries.insert(key, entry).await;
    }

    /// Drop one entry.
    pub async fn invalidate(&self, key: &K) {
        self.entries.invalidate(key).await;
    }

    /// Drop every entry regardless of age.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}
