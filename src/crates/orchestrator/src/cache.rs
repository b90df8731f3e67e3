//! TTL memoization for the peripheral lookup endpoints
//!
//! Entries are never invalidated, only aged out. Concurrent misses on the
//! same key may both fetch upstream; the later `put` wins. Expired entries are
//! swept from `put` at most once per TTL, so memory stays bounded by what was
//! written within roughly two TTLs.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A cache whose entries are authoritative for `ttl` after insertion.
pub trait TtlCache<K, V>: Send + Sync {
    /// Raw entry with its insertion time, fresh or not.
    fn get(&self, key: &K) -> Option<(Instant, V)>;

    fn put(&self, key: K, value: V);

    fn ttl(&self) -> Duration;

    /// Value for `key` if it was stored less than `ttl` ago.
    fn get_fresh(&self, key: &K) -> Option<V> {
        let (stored_at, value) = self.get(key)?;
        (stored_at.elapsed() < self.ttl()).then_some(value)
    }
}

/// In-process [`TtlCache`] over a sharded concurrent map.
pub struct InMemoryTtlCache<K, V> {
    entries: Arc<DashMap<K, (Instant, V)>>,
    ttl: Duration,
    last_sweep: Arc<Mutex<Instant>>,
}

impl<K, V> Clone for InMemoryTtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            ttl: self.ttl,
            last_sweep: self.last_sweep.clone(),
        }
    }
}

impl<K, V> InMemoryTtlCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            last_sweep: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries older than the TTL.
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
    }

    /// Purge when a full TTL has passed since the previous sweep.
    fn sweep_if_due(&self) {
        {
            let mut last_sweep = self.last_sweep.lock();
            if last_sweep.elapsed() < self.ttl {
                return;
            }
            *last_sweep = Instant::now();
        }
        self.purge_expired();
    }
}

impl<K, V> TtlCache<K, V> for InMemoryTtlCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<(Instant, V)> {
        self.entries
            .get(key)
            .map(|entry| (entry.0, entry.1.clone()))
    }

    fn put(&self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
        self.sweep_if_due();
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_until_ttl() {
        let cache: InMemoryTtlCache<String, u32> = InMemoryTtlCache::new(Duration::from_secs(60));
        cache.put("tactic".into(), 7);

        assert_eq!(cache.get_fresh(&"tactic".to_string()), Some(7));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get_fresh(&"tactic".to_string()), Some(7));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get_fresh(&"tactic".to_string()), None);
        // Stale entries stay readable until purged
        assert!(cache.get(&"tactic".to_string()).is_some());

        cache.purge_expired();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_refreshes_timestamp() {
        let cache = InMemoryTtlCache::new(Duration::from_secs(10));
        cache.put(("a".to_string(), "b".to_string()), "v1");

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put(("a".to_string(), "b".to_string()), "v2");

        tokio::time::advance(Duration::from_secs(8)).await;
        let key = ("a".to_string(), "b".to_string());
        assert_eq!(cache.get_fresh(&key), Some("v2"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_sweeps_expired_entries() {
        let cache: InMemoryTtlCache<String, u32> = InMemoryTtlCache::new(Duration::from_secs(10));
        cache.put("old".into(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        cache.put("middle".into(), 2);
        // Not due yet: nothing has expired anyway
        assert_eq!(cache.len(), 2);

        tokio::time::advance(Duration::from_secs(6)).await;
        cache.put("new".into(), 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&"old".to_string()).is_none());
        assert_eq!(cache.get_fresh(&"middle".to_string()), Some(2));
        assert_eq!(cache.get_fresh(&"new".to_string()), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_runs_at_most_once_per_ttl() {
        let cache: InMemoryTtlCache<String, u32> = InMemoryTtlCache::new(Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(10)).await;
        cache.put("a".into(), 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        // Sweep from the previous put was 11s ago, so this one purges "a"
        cache.put("b".into(), 2);
        assert_eq!(cache.len(), 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        cache.put("c".into(), 3);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_fresh(&"c".to_string()), Some(3));
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache: InMemoryTtlCache<String, String> = InMemoryTtlCache::new(Duration::from_secs(5));
        let other = cache.clone();
        other.put("k".into(), "v".into());
        assert_eq!(cache.get_fresh(&"k".to_string()).as_deref(), Some("v"));
    }
}
