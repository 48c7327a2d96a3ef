use dashmap::DashMap;
use parking_lot::Mutex;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// The cache domains the rest of the system reads from. Each namespace gets
/// its own TTL and, indirectly through `CacheConfig::capacity_for`, its own
/// size cap — mirroring `cline_utils/.../cache_manager.py`'s per-named
/// `Cache` instances (`CACHE_SIZES`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    TrackerData,
    GridDecompression,
    FileValidation,
    ConfigSnapshot,
    EmbeddingPath,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    pub default_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            default_capacity: 4096,
        }
    }
}

impl CacheConfig {
    /// Per-namespace TTL override. Grid decompression and file-validation
    /// results are cheap to recompute and keyed on mtime already, so they
    /// get a longer TTL than tracker data, which should reflect disk writes
    /// promptly.
    pub fn ttl_for(&self, ns: Namespace) -> Duration {
        match ns {
            Namespace::TrackerData => Duration::from_secs(60),
            Namespace::GridDecompression => self.default_ttl,
            Namespace::FileValidation => Duration::from_secs(600),
            Namespace::ConfigSnapshot => Duration::from_secs(30),
            Namespace::EmbeddingPath => self.default_ttl,
        }
    }

    pub fn capacity_for(&self, ns: Namespace) -> usize {
        match ns {
            Namespace::FileValidation => self.default_capacity * 4,
            _ => self.default_capacity,
        }
    }
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// A namespaced, TTL-bounded cache keyed by `(Namespace, K)`.
///
/// Invalidation is explicit: callers key entries on `(path, mtime)` so a
/// changed file naturally misses rather than needing a delete call, matching
/// the invalidation model in spec.md §5.
pub struct Cache<K, V> {
    config: CacheConfig,
    store: DashMap<(Namespace, K), Entry<V>>,
    insertion_order: Mutex<Vec<(Namespace, K)>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            store: DashMap::new(),
            insertion_order: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, ns: Namespace, key: &K) -> Option<V> {
        let map_key = (ns, key.clone());
        let ttl = self.config.ttl_for(ns);
        let hit = self.store.get(&map_key).and_then(|entry| {
            if entry.inserted_at.elapsed() <= ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        });
        if hit.is_none() {
            self.store.remove(&map_key);
        }
        hit
    }

    pub fn insert(&self, ns: Namespace, key: K, value: V) {
        let map_key = (ns, key);
        self.store.insert(
            map_key.clone(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
        let mut order = self.insertion_order.lock();
        order.retain(|k| k != &map_key);
        order.push(map_key.clone());
        self.evict_if_needed(ns, &mut order);
    }

    pub fn invalidate(&self, ns: Namespace, key: &K) {
        let map_key = (ns, key.clone());
        self.store.remove(&map_key);
        self.insertion_order.lock().retain(|k| k != &map_key);
    }

    pub fn invalidate_namespace(&self, ns: Namespace) {
        self.store.retain(|k, _| k.0 != ns);
        self.insertion_order.lock().retain(|k| k.0 != ns);
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn evict_if_needed(&self, ns: Namespace, order: &mut Vec<(Namespace, K)>) {
        let cap = self.config.capacity_for(ns);
        let ns_count = order.iter().filter(|k| k.0 == ns).count();
        if ns_count <= cap {
            return;
        }
        let to_evict = ns_count - cap;
        let mut evicted = 0;
        let mut i = 0;
        while i < order.len() && evicted < to_evict {
            if order[i].0 == ns {
                let key = order.remove(i);
                self.store.remove(&key);
                evicted += 1;
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_hits() {
        let cache: Cache<String, u32> = Cache::new(CacheConfig::default());
        cache.insert(Namespace::GridDecompression, "k".to_string(), 42);
        assert_eq!(cache.get(Namespace::GridDecompression, &"k".to_string()), Some(42));
    }

    #[test]
    fn separate_namespaces_dont_collide() {
        let cache: Cache<String, u32> = Cache::new(CacheConfig::default());
        cache.insert(Namespace::TrackerData, "k".to_string(), 1);
        cache.insert(Namespace::GridDecompression, "k".to_string(), 2);
        assert_eq!(cache.get(Namespace::TrackerData, &"k".to_string()), Some(1));
        assert_eq!(cache.get(Namespace::GridDecompression, &"k".to_string()), Some(2));
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache: Cache<String, u32> = Cache::new(CacheConfig::default());
        cache.insert(Namespace::ConfigSnapshot, "k".to_string(), 7);
        cache.invalidate(Namespace::ConfigSnapshot, &"k".to_string());
        assert_eq!(cache.get(Namespace::ConfigSnapshot, &"k".to_string()), None);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut config = CacheConfig::default();
        config.default_capacity = 2;
        let cache: Cache<u32, u32> = Cache::new(config);
        cache.insert(Namespace::EmbeddingPath, 1, 1);
        cache.insert(Namespace::EmbeddingPath, 2, 2);
        cache.insert(Namespace::EmbeddingPath, 3, 3);
        assert_eq!(cache.get(Namespace::EmbeddingPath, &1), None);
        assert_eq!(cache.get(Namespace::EmbeddingPath, &3), Some(3));
    }
}
