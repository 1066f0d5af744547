//! In-memory chapter-list cache.
//!
//! Holds the full ordered chapter index per book, bounded by entry count
//! (least-recently-used eviction) and expiring after a period without access.
//! The book's persisted snapshot is the second tier behind this one; the
//! orchestrator decides when to consult it.

use std::time::Duration;

use crate::core::models::{BookId, ChapterList};
use crate::storage::bounded::{BoundedMap, Expiry};

/// Default maximum number of books held in memory.
pub const DEFAULT_MAX_ENTRIES: usize = 64;
/// Default idle expiry for a cached chapter list.
pub const DEFAULT_IDLE: Duration = Duration::from_secs(3600);

#[derive(Debug)]
pub struct ChapterListCache {
    entries: BoundedMap<BookId, ChapterList>,
}

impl ChapterListCache {
    #[must_use]
    pub fn new(max_entries: usize, idle: Duration) -> Self {
        Self {
            entries: BoundedMap::new(max_entries, Expiry::AfterAccess(idle)),
        }
    }

    pub fn get(&self, book_id: &BookId) -> Option<ChapterList> {
        self.entries.get(book_id)
    }

    pub fn put(&self, book_id: BookId, chapters: ChapterList) {
        if let Some(evicted) = self.entries.insert(book_id, chapters) {
            tracing::debug!(book_id = %evicted, "Evicted chapter list from memory cache");
        }
    }

    pub fn invalidate(&self, book_id: &BookId) {
        self.entries.remove(book_id);
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Drop lists idle past their expiry; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.entries.purge_expired()
    }

    /// Resident entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

impl Default for ChapterListCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_IDLE)
    }
}
