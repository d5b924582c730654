//! Storage backends for the expiring cache engine.

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use super::entry::CacheEntry;
use crate::Error;

/// Storage contract consumed by [`ExpiringCache`](super::ExpiringCache).
///
/// Implementations must be safe for concurrent use and serialize
/// structural mutations per key.
pub trait CacheStore<K, V>: Send + Sync {
    /// Fetch an entry, marking it as most recently used.
    fn get(&self, key: &K) -> Option<CacheEntry<V>>;

    /// Insert or overwrite `key`.
    ///
    /// Returns the entry displaced by capacity pressure, if any. Overwriting
    /// an existing key is not an eviction.
    fn insert(&self, key: K, entry: CacheEntry<V>) -> Option<(K, CacheEntry<V>)>;

    fn remove(&self, key: &K) -> Option<CacheEntry<V>>;

    /// Remove `key` only if its current entry satisfies `predicate`.
    fn remove_if(&self, key: &K, predicate: &dyn Fn(&CacheEntry<V>) -> bool) -> Option<CacheEntry<V>>;

    /// Remove and return every entry matching `predicate`.
    fn drain_where(&self, predicate: &dyn Fn(&CacheEntry<V>) -> bool) -> Vec<(K, CacheEntry<V>)>;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capacity-bounded store with least-recently-used eviction.
pub struct LruStore<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, CacheEntry<V>>>,
    capacity: NonZeroUsize,
}

impl<K: Hash + Eq, V> LruStore<K, V> {
    /// Create a store holding at most `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| Error::Configuration(format!("cache capacity must be positive, got {capacity}")))?;
        Ok(Self { entries: Mutex::new(LruCache::new(capacity)), capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Whether `key` is present, without touching recency.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains(key)
    }
}

impl<K, V> CacheStore<K, V> for LruStore<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.lock().get(key).cloned()
    }

    fn insert(&self, key: K, entry: CacheEntry<V>) -> Option<(K, CacheEntry<V>)> {
        let mut entries = self.entries.lock();
        if entries.contains(&key) {
            entries.put(key, entry);
            None
        } else {
            entries.push(key, entry)
        }
    }

    fn remove(&self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.lock().pop(key)
    }

    fn remove_if(&self, key: &K, predicate: &dyn Fn(&CacheEntry<V>) -> bool) -> Option<CacheEntry<V>> {
        let mut entries = self.entries.lock();
        if entries.peek(key).is_some_and(predicate) { entries.pop(key) } else { None }
    }

    fn drain_where(&self, predicate: &dyn Fn(&CacheEntry<V>) -> bool) -> Vec<(K, CacheEntry<V>)> {
        let mut entries = self.entries.lock();
        let matching: Vec<K> = entries
            .iter()
            .filter(|&(_, entry)| predicate(entry))
            .map(|(key, _)| key.clone())
            .collect();

        matching
            .into_iter()
            .filter_map(|key| entries.pop_entry(&key))
            .collect()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for LruStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruStore")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn entry(v: i32) -> CacheEntry<i32> {
        CacheEntry::unlimited(v)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = LruStore::<String, i32>::new(0);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_evicts_least_recently_inserted() {
        let store = LruStore::new(3).unwrap();
        assert!(store.insert("a", entry(1)).is_none());
        assert!(store.insert("b", entry(2)).is_none());
        assert!(store.insert("c", entry(3)).is_none());

        let evicted = store.insert("d", entry(4));
        assert_eq!(evicted.map(|(k, _)| k), Some("a"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_read_refreshes_recency() {
        let store = LruStore::new(3).unwrap();
        store.insert("a", entry(1));
        store.insert("b", entry(2));
        store.insert("c", entry(3));

        assert!(store.get(&"a").is_some());

        let evicted = store.insert("d", entry(4));
        assert_eq!(evicted.map(|(k, _)| k), Some("b"));
        assert!(store.contains(&"a"));
    }

    #[test]
    fn test_overwrite_is_not_eviction() {
        let store = LruStore::new(2).unwrap();
        store.insert("a", entry(1));
        store.insert("b", entry(2));

        assert!(store.insert("a", entry(10)).is_none());
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&"a").map(|e| *e.content()), Some(10));
    }

    #[test]
    fn test_remove_reports_presence() {
        let store = LruStore::new(2).unwrap();
        store.insert("a", entry(1));
        assert!(store.remove(&"a").is_some());
        assert!(store.remove(&"a").is_none());
    }

    #[test]
    fn test_remove_if() {
        let store = LruStore::new(2).unwrap();
        store.insert("a", entry(1));

        assert!(store.remove_if(&"a", &|e| *e.content() == 2).is_none());
        assert!(store.remove_if(&"a", &|e| *e.content() == 1).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_drain_where() {
        let store = LruStore::new(4).unwrap();
        for (k, v) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
            store.insert(k, entry(v));
        }

        let mut drained: Vec<&str> = store
            .drain_where(&|e| e.content() % 2 == 0)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        drained.sort_unstable();

        assert_eq!(drained, vec!["b", "d"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_concurrent_inserts_respect_capacity() {
        let store = Arc::new(LruStore::new(16).unwrap());
        let mut handles = vec![];

        for t in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    store.insert(t * 1000 + i, entry(i));
                    store.get(&(t * 1000 + i));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 16);
    }
}
