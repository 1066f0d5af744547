//! Request deduplication.
//!
//! At most one operation per key is in flight. A second caller for the same key
//! gets a clone of the first caller's [`Shared`] future and observes the same
//! outcome, success or failure.
//!
//! Each registered operation is also spawned onto the runtime, so it runs to
//! completion (and populates caches) even if every caller stops waiting.
//!
//! The registration is removed by the operation itself, after its work has
//! finished and before its output is handed to any caller. A caller that has
//! seen the result can therefore never join the finished operation again.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;

/// Handle to a deduplicated operation.
pub type SharedFetch<V> = Shared<BoxFuture<'static, V>>;

struct Registry<K, V> {
    next_generation: u64,
    entries: HashMap<K, (u64, SharedFetch<V>)>,
}

/// In-flight operation registry keyed by `K`.
pub struct RequestDeduplicator<K, V> {
    inner: Arc<Mutex<Registry<K, V>>>,
}

impl<K, V> RequestDeduplicator<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_generation: 0,
                entries: HashMap::new(),
            })),
        }
    }

    /// Join the in-flight operation for `key`, or start one with `factory`.
    ///
    /// `factory` is only called when no operation is registered. Must be
    /// called from within a tokio runtime.
    pub fn get_or_create<F, Fut>(&self, key: K, factory: F) -> SharedFetch<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let mut registry = self.inner.lock();
        if let Some((_, pending)) = registry.entries.get(&key) {
            tracing::trace!("Joining in-flight request");
            return pending.clone();
        }

        let generation = registry.next_generation;
        registry.next_generation = registry.next_generation.wrapping_add(1);

        let work = factory();
        let owner = Arc::clone(&self.inner);
        let cleanup_key = key.clone();
        let shared = async move {
            let output = work.await;
            let mut registry = owner.lock();
            if registry
                .entries
                .get(&cleanup_key)
                .is_some_and(|(current, _)| *current == generation)
            {
                registry.entries.remove(&cleanup_key);
            }
            output
        }
        .boxed()
        .shared();

        registry.entries.insert(key, (generation, shared.clone()));
        drop(registry);

        tokio::spawn(shared.clone());
        shared
    }

    /// Whether an operation for `key` is in flight.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Number of operations in flight.
    pub fn in_flight_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Handles to every operation in flight right now.
    pub fn in_flight(&self) -> Vec<SharedFetch<V>> {
        self.inner
            .lock()
            .entries
            .values()
            .map(|(_, pending)| pending.clone())
            .collect()
    }
}

impl<K, V> Default for RequestDeduplicator<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for RequestDeduplicator<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> std::fmt::Debug for RequestDeduplicator<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDeduplicator")
            .field("in_flight", &self.inner.lock().entries.len())
            .finish()
    }
}
