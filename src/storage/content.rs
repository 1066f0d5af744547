//! Persistent chapter-content cache.
//!
//! Maps (book, chapter) to chapter text. Two tiers:
//! - a bounded in-memory tier for the chapters being read right now
//! - one JSON file per chapter on disk, written atomically (temp file + rename)
//!
//! # Read modes
//! - [`ContentCacheStore::get`] only returns entries younger than the TTL.
//! - [`ContentCacheStore::get_fallback`] ignores age. It exists for the
//!   "network failed, serve whatever we have" path.
//!
//! Staleness never deletes anything. Entries leave the cache only through
//! [`ContentCacheStore::clear`] / [`ContentCacheStore::clear_all`] or memory
//! tier eviction (the disk copy survives that).
//!
//! Disk errors are logged and reported as cache misses; a failed persist still
//! leaves the text servable from the memory tier.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::models::{BookId, ChapterId, short_hash};
use crate::error::{NovelError, Result};
use crate::storage::bounded::{BoundedMap, Expiry};
use crate::storage::write_atomic;

/// Default freshness window for chapter text (7 days).
pub const DEFAULT_CONTENT_TTL_SECS: u64 = 7 * 24 * 3600;
/// Default number of chapters held in the memory tier.
pub const DEFAULT_MEMORY_ENTRIES: usize = 256;

type ContentKey = (BookId, ChapterId);

/// Performance counters for one content store.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Fresh reads served from memory.
    pub memory_hits: AtomicU64,
    /// Fresh reads served from disk.
    pub disk_hits: AtomicU64,
    /// Fresh reads that found nothing usable.
    pub misses: AtomicU64,
    /// Reads served by the fallback path.
    pub fallback_hits: AtomicU64,
    /// Successful disk writes.
    pub writes: AtomicU64,
    /// Failed disk writes.
    pub write_failures: AtomicU64,
}

impl CacheMetrics {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// On-disk representation of one cached chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntry {
    pub book_id: BookId,
    pub chapter_id: ChapterId,
    pub text: String,
    pub cached_at: DateTime<Utc>,
}

impl ContentEntry {
    #[must_use]
    pub fn new(book_id: BookId, chapter_id: ChapterId, text: impl Into<String>) -> Self {
        Self {
            book_id,
            chapter_id,
            text: text.into(),
            cached_at: Utc::now(),
        }
    }

    /// Age of the entry (zero for timestamps in the future).
    #[must_use]
    pub fn age(&self) -> Duration {
        age_of(self.cached_at)
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    text: Arc<str>,
    cached_at: DateTime<Utc>,
}

fn age_of(cached_at: DateTime<Utc>) -> Duration {
    (Utc::now() - cached_at).to_std().unwrap_or(Duration::ZERO)
}

/// Chapter-content cache with a memory tier over durable files.
#[derive(Debug)]
pub struct ContentCacheStore {
    root: PathBuf,
    ttl: Duration,
    memory: BoundedMap<ContentKey, MemoryEntry>,
    metrics: CacheMetrics,
    temp_counter: AtomicU64,
}

impl ContentCacheStore {
    /// Create a store rooted at `root`.
    ///
    /// A directory that cannot be created is logged; the store then behaves as
    /// memory-only until writes start succeeding.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, ttl: Duration, memory_entries: usize) -> Self {
        let root = root.into();
        if let Err(e) = std::fs::create_dir_all(&root) {
            tracing::warn!(path = %root.display(), error = %e, "Failed to create content cache dir");
        }
        Self {
            root,
            ttl,
            memory: BoundedMap::new(memory_entries, Expiry::Never),
            metrics: CacheMetrics::default(),
            temp_counter: AtomicU64::new(0),
        }
    }

    /// Directory holding the on-disk tier.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub const fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Number of chapters resident in the memory tier.
    #[must_use]
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    fn book_dir(&self, book_id: &BookId) -> PathBuf {
        self.root.join(short_hash(book_id.as_str()))
    }

    /// Path of the file backing one chapter.
    #[must_use]
    pub fn entry_path(&self, book_id: &BookId, chapter_id: &ChapterId) -> PathBuf {
        self.book_dir(book_id)
            .join(format!("{}.json", short_hash(chapter_id.as_str())))
    }

    fn is_fresh(&self, cached_at: DateTime<Utc>) -> bool {
        age_of(cached_at) <= self.ttl
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fresh-only read: `None` if missing or older than the TTL.
    pub fn get(&self, book_id: &BookId, chapter_id: &ChapterId) -> Option<String> {
        let key = (book_id.clone(), chapter_id.clone());
        if let Some(entry) = self.memory.get(&key) {
            if self.is_fresh(entry.cached_at) {
                CacheMetrics::bump(&self.metrics.memory_hits);
                return Some(entry.text.to_string());
            }
        }

        match self.read_entry(book_id, chapter_id) {
            Some(entry) if self.is_fresh(entry.cached_at) => {
                CacheMetrics::bump(&self.metrics.disk_hits);
                self.remember(key, &entry.text, entry.cached_at);
                Some(entry.text)
            }
            _ => {
                CacheMetrics::bump(&self.metrics.misses);
                None
            }
        }
    }

    /// Whether a fresh entry exists.
    ///
    /// Leaves metrics, LRU order and the memory tier untouched.
    pub fn contains_fresh(&self, book_id: &BookId, chapter_id: &ChapterId) -> bool {
        let key = (book_id.clone(), chapter_id.clone());
        if self
            .memory
            .peek(&key)
            .is_some_and(|entry| self.is_fresh(entry.cached_at))
        {
            return true;
        }
        self.read_entry(book_id, chapter_id)
            .is_some_and(|entry| self.is_fresh(entry.cached_at))
    }

    /// Age-agnostic read, used only after a network failure.
    pub fn get_fallback(&self, book_id: &BookId, chapter_id: &ChapterId) -> Option<String> {
        let key = (book_id.clone(), chapter_id.clone());
        if let Some(entry) = self.memory.get(&key) {
            CacheMetrics::bump(&self.metrics.fallback_hits);
            return Some(entry.text.to_string());
        }

        let entry = self.read_entry(book_id, chapter_id)?;
        CacheMetrics::bump(&self.metrics.fallback_hits);
        tracing::debug!(
            book_id = %book_id,
            chapter_id = %chapter_id,
            age_secs = entry.age().as_secs(),
            "Serving stale chapter content"
        );
        self.remember(key, &entry.text, entry.cached_at);
        Some(entry.text)
    }

    /// Read the on-disk entry regardless of age.
    ///
    /// Missing, unreadable and corrupt files are all treated as absent.
    pub fn read_entry(&self, book_id: &BookId, chapter_id: &ChapterId) -> Option<ContentEntry> {
        let path = self.entry_path(book_id, chapter_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read content cache entry");
                return None;
            }
        };
        match serde_json::from_str::<ContentEntry>(&content) {
            Ok(entry) if entry.chapter_id == *chapter_id => Some(entry),
            Ok(_) => {
                tracing::warn!(path = %path.display(), "Content cache entry key mismatch, ignoring");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt content cache entry, ignoring");
                None
            }
        }
    }

    fn remember(&self, key: ContentKey, text: &str, cached_at: DateTime<Utc>) {
        self.memory.insert(
            key,
            MemoryEntry {
                text: Arc::from(text),
                cached_at,
            },
        );
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store chapter text, resetting its freshness clock.
    ///
    /// The memory tier is always updated; a failed disk write is logged.
    pub fn put(&self, book_id: &BookId, chapter_id: &ChapterId, text: &str) {
        let entry = ContentEntry::new(book_id.clone(), chapter_id.clone(), text);
        self.remember((book_id.clone(), chapter_id.clone()), text, entry.cached_at);
        if let Err(e) = self.write_entry(&entry) {
            CacheMetrics::bump(&self.metrics.write_failures);
            tracing::warn!(
                book_id = %book_id,
                chapter_id = %chapter_id,
                error = %e,
                "Failed to persist chapter content"
            );
        }
    }

    /// Write a pre-built entry to disk only (useful for tests and imports).
    pub fn write_entry(&self, entry: &ContentEntry) -> Result<()> {
        let path = self.entry_path(&entry.book_id, &entry.chapter_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| NovelError::cache_io(parent, e))?;
        }
        let content = serde_json::to_string(entry)?;
        write_atomic(&path, content.as_bytes(), &self.temp_counter)
            .map_err(|e| NovelError::cache_io(&path, e))?;
        CacheMetrics::bump(&self.metrics.writes);
        Ok(())
    }

    // =========================================================================
    // Eviction
    // =========================================================================

    /// Remove every cached chapter of one book.
    pub fn clear(&self, book_id: &BookId) -> Result<()> {
        let removed = self.memory.remove_where(|(book, _)| book == book_id);
        let dir = self.book_dir(book_id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(NovelError::cache_io(dir, e)),
        }
        tracing::debug!(book_id = %book_id, memory_entries = removed, "Cleared book content cache");
        Ok(())
    }

    /// Remove every cached chapter of every book.
    pub fn clear_all(&self) -> Result<()> {
        self.memory.clear();
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(NovelError::cache_io(&self.root, e)),
        };
        for entry in entries {
            let path = entry.map_err(|e| NovelError::cache_io(&self.root, e))?.path();
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            removed.map_err(|e| NovelError::cache_io(&path, e))?;
        }
        tracing::debug!(path = %self.root.display(), "Cleared all content cache");
        Ok(())
    }
}
