//! Bounded, time-expiring in-memory map.
//!
//! Shared building block for the chapter-list cache and the fetch throttle:
//! a capacity ceiling with least-recently-used eviction, plus one expiry rule
//! per map. Expired entries are dropped lazily on access and by
//! [`BoundedMap::purge_expired`].
//!
//! Timestamps come from [`tokio::time::Instant`] so tests can drive expiry with
//! a paused runtime clock.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;

/// When an entry stops being servable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Expire after this long without a read or write.
    AfterAccess(Duration),
    /// Expire this long after the last write, regardless of reads.
    AfterWrite(Duration),
    /// Only capacity eviction removes entries.
    Never,
}

#[derive(Debug)]
struct Slot<V> {
    value: V,
    written_at: Instant,
    touched_at: Instant,
}

impl<V> Slot<V> {
    fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            written_at: now,
            touched_at: now,
        }
    }

    fn is_expired(&self, expiry: Expiry, now: Instant) -> bool {
        match expiry {
            Expiry::AfterAccess(ttl) => now.saturating_duration_since(self.touched_at) >= ttl,
            Expiry::AfterWrite(ttl) => now.saturating_duration_since(self.written_at) >= ttl,
            Expiry::Never => false,
        }
    }
}

/// Thread-safe LRU map with a single expiry policy.
///
/// All operations take a short, non-async lock; nothing is held across an
/// `.await`.
pub struct BoundedMap<K, V> {
    entries: Mutex<LruCache<K, Slot<V>>>,
    expiry: Expiry,
}

impl<K, V> BoundedMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a map holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize, expiry: Expiry) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            expiry,
        }
    }

    /// Read a live entry, promoting it in LRU order.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired = match entries.get_mut(key) {
            None => return None,
            Some(slot) if slot.is_expired(self.expiry, now) => true,
            Some(slot) => {
                slot.touched_at = now;
                return Some(slot.value.clone());
            }
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    /// Read a live entry without touching LRU order or access time.
    pub fn peek(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.entries
            .lock()
            .peek(key)
            .filter(|slot| !slot.is_expired(self.expiry, now))
            .map(|slot| slot.value.clone())
    }

    /// Whether a live entry exists, without touching LRU order or access time.
    pub fn contains_live(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .peek(key)
            .is_some_and(|slot| !slot.is_expired(self.expiry, now))
    }

    /// Insert or overwrite an entry; returns the evicted least-recently-used
    /// key when the insert pushed the map over capacity.
    pub fn insert(&self, key: K, value: V) -> Option<K> {
        let slot = Slot::new(value, Instant::now());
        let mut entries = self.entries.lock();
        match entries.push(key.clone(), slot) {
            Some((evicted, _)) if evicted != key => Some(evicted),
            _ => None,
        }
    }

    /// Remove an entry, returning its value if it was still live.
    pub fn remove(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.entries
            .lock()
            .pop(key)
            .filter(|slot| !slot.is_expired(self.expiry, now))
            .map(|slot| slot.value)
    }

    /// Remove every entry whose key matches; returns how many were removed.
    pub fn remove_where(&self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let mut entries = self.entries.lock();
        let doomed: Vec<K> = entries
            .iter()
            .filter(|(key, _)| predicate(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drop expired entries eagerly; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired: Vec<K> = entries
            .iter()
            .filter(|(_, slot)| slot.is_expired(self.expiry, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    /// Number of resident entries (live or not yet purged).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity ceiling.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Configured expiry rule.
    pub const fn expiry(&self) -> Expiry {
        self.expiry
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for BoundedMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("BoundedMap")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_evicts_least_recently_used() {
        let map = BoundedMap::new(2, Expiry::Never);
        map.insert("a", 1);
        map.insert("b", 2);
        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(map.get(&"a"), Some(1));

        let evicted = map.insert("c", 3);
        assert_eq!(evicted, Some("b"));
        assert_eq!(map.len(), 2);
        assert!(map.get(&"b").is_none());
        assert_eq!(map.get(&"a"), Some(1));
        assert_eq!(map.get(&"c"), Some(3));
    }

    #[test]
    fn overwrite_is_not_an_eviction() {
        let map = BoundedMap::new(1, Expiry::Never);
        map.insert("a", 1);
        assert_eq!(map.insert("a", 2), None);
        assert_eq!(map.get(&"a"), Some(2));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let map: BoundedMap<&str, i32> = BoundedMap::new(0, Expiry::Never);
        assert_eq!(map.capacity(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn access_expiry_is_extended_by_reads() {
        let map = BoundedMap::new(4, Expiry::AfterAccess(Duration::from_secs(10)));
        map.insert("a", 1);

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(map.get(&"a"), Some(1));

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(map.get(&"a"), Some(1), "read at t=8 should extend the window");

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(map.get(&"a").is_none());
        assert!(map.is_empty(), "expired entry should be dropped on access");
    }

    #[tokio::test(start_paused = true)]
    async fn write_expiry_ignores_reads() {
        let map = BoundedMap::new(4, Expiry::AfterWrite(Duration::from_secs(10)));
        map.insert("a", 1);

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(map.contains_live(&"a"));
        assert_eq!(map.get(&"a"), Some(1));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(!map.contains_live(&"a"));
        assert!(map.get(&"a").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_removes_only_stale_entries() {
        let map = BoundedMap::new(4, Expiry::AfterWrite(Duration::from_secs(5)));
        map.insert("old", 1);
        tokio::time::advance(Duration::from_secs(6)).await;
        map.insert("new", 2);

        assert_eq!(map.purge_expired(), 1);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&"new"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn peek_does_not_extend_access_expiry() {
        let map = BoundedMap::new(4, Expiry::AfterAccess(Duration::from_secs(10)));
        map.insert("a", 1);

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(map.peek(&"a"), Some(1));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(map.peek(&"a"), None);
        assert_eq!(map.len(), 1, "peek never removes");
    }

    #[test]
    fn remove_where_matches_keys() {
        let map = BoundedMap::new(8, Expiry::Never);
        map.insert(("b1", 1), "a");
        map.insert(("b1", 2), "b");
        map.insert(("b2", 1), "c");
        assert_eq!(map.remove_where(|(book, _)| *book == "b1"), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&("b2", 1)), Some("c"));
    }

    #[test]
    fn remove_and_clear() {
        let map = BoundedMap::new(4, Expiry::Never);
        map.insert(1, "x");
        map.insert(2, "y");
        assert_eq!(map.remove(&1), Some("x"));
        assert_eq!(map.remove(&1), None);
        map.clear();
        assert!(map.is_empty());
    }
}
