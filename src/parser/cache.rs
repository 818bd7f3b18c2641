//! Bounded LRU cache over parsed queries, keyed by exact query text
//! (spec.md §4.1: "memoized by exact query text; the cache is bounded
//! ... default ≥ 256 entries, LRU"; §5: "safe under concurrent `parse`
//! calls"). Generalized from the teacher's `server::query_cache::QueryCache`
//! — same `Mutex<HashMap<..>>` + recency bookkeeping + size-triggered
//! eviction shape, narrowed to key on query text alone (no schema
//! dimension) and to hold the parsed `(Statement, ResidualParams,
//! SemanticState)` triple instead of a rendered SQL string.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

struct Entry<T> {
    value: Arc<T>,
    last_used: u64,
}

/// `T` is expected to be cheap to share once parsed — cache hits return the
/// same `Arc<T>` handle rather than re-parsing (spec.md "cache hits return
/// structurally identical AST handles; ASTs are immutable").
pub struct QueryCache<T> {
    entries: Mutex<HashMap<String, Entry<T>>>,
    capacity: usize,
    clock: AtomicU64,
}

impl<T> QueryCache<T> {
    pub fn new(capacity: usize) -> Self {
        QueryCache {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self, query: &str) -> Option<Arc<T>> {
        let mut entries = self.entries.lock().expect("query cache mutex poisoned");
        let tick = self.tick();
        entries.get_mut(query).map(|entry| {
            entry.last_used = tick;
            Arc::clone(&entry.value)
        })
    }

    pub fn insert(&self, query: String, value: Arc<T>) {
        let mut entries = self.entries.lock().expect("query cache mutex poisoned");
        if entries.len() >= self.capacity && !entries.contains_key(&query) {
            self.evict_lru(&mut entries);
        }
        let tick = self.tick();
        entries.insert(query, Entry { value, last_used: tick });
    }

    fn evict_lru(&self, entries: &mut HashMap<String, Entry<T>>) {
        if let Some(key) = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone())
        {
            entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("query cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().expect("query cache mutex poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_after_insert_returns_same_handle() {
        let cache: QueryCache<u32> = QueryCache::new(8);
        cache.insert("MATCH (n) RETURN n".to_string(), Arc::new(42));
        let hit = cache.get("MATCH (n) RETURN n").unwrap();
        assert_eq!(*hit, 42);
        assert!(Arc::ptr_eq(&hit, &cache.get("MATCH (n) RETURN n").unwrap()));
    }

    #[test]
    fn miss_on_unknown_query() {
        let cache: QueryCache<u32> = QueryCache::new(8);
        assert!(cache.get("MATCH (n) RETURN n").is_none());
    }

    #[test]
    fn evicts_least_recently_used_when_full() {
        let cache: QueryCache<u32> = QueryCache::new(2);
        cache.insert("a".to_string(), Arc::new(1));
        cache.insert("b".to_string(), Arc::new(2));
        // touch "a" so "b" becomes the LRU entry.
        cache.get("a");
        cache.insert("c".to_string(), Arc::new(3));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reinserting_existing_key_does_not_evict() {
        let cache: QueryCache<u32> = QueryCache::new(1);
        cache.insert("a".to_string(), Arc::new(1));
        cache.insert("a".to_string(), Arc::new(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(*cache.get("a").unwrap(), 2);
    }
}
