//! Read-through lookup cache using Moka.
//!
//! Entries expire against the injected [`Clock`] rather than wall time, so
//! expiry is deterministic under a [`crate::clock::FixedClock`].

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use moka::sync::Cache;

use crate::clock::Clock;

/// Read-through cache with a time-to-live.
///
/// Thread-safe and cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct ReadThroughCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<K, (V, DateTime<Utc>)>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> ReadThroughCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache.
    ///
    /// # Arguments
    ///
    /// * `clock` - Time source used to stamp and expire entries
    /// * `max_capacity` - Maximum number of entries to cache
    /// * `ttl` - Time-to-live for each entry
    #[must_use]
    pub fn with_config(clock: Arc<dyn Clock>, max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).build();
        Self { cache, ttl, clock }
    }

    /// Returns the cached value if present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let (value, fetched_at) = self.cache.get(key)?;
        if self.clock.now() - fetched_at < self.ttl {
            Some(value)
        } else {
            self.cache.invalidate(key);
            None
        }
    }

    /// Stores a value, stamped with the current time.
    pub fn insert(&self, key: K, value: V) {
        self.cache.insert(key, (value, self.clock.now()));
    }

    /// Returns the cached value, or loads, stores and returns a fresh one.
    ///
    /// Loader errors are returned as-is and nothing is cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = load().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

}
