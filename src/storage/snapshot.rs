//! Persisted chapter-list snapshots.
//!
//! The book-metadata subsystem owns each book's last-known chapter list. The
//! cache engine reads it on a chapter-list cache miss and writes it back after
//! a successful network refresh, through the [`SnapshotStore`] boundary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::models::{BookId, Chapter, short_hash};
use crate::error::{NovelError, Result};
use crate::storage::write_atomic;

/// Storage for per-book chapter-list snapshots.
///
/// `save` must be atomic with respect to concurrent `load`s: a reader sees
/// either the previous list or the new one, never a partial write.
pub trait SnapshotStore: Send + Sync {
    /// Load the book's last saved chapter list, if any.
    fn load(&self, book_id: &BookId) -> Result<Option<Vec<Chapter>>>;

    /// Replace the book's saved chapter list.
    fn save(&self, book_id: &BookId, chapters: &[Chapter]) -> Result<()>;
}

// =============================================================================
// JSON files
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile {
    book_id: BookId,
    saved_at: DateTime<Utc>,
    chapters: Vec<Chapter>,
}

/// One JSON file per book under a directory.
#[derive(Debug)]
pub struct JsonSnapshotStore {
    dir: PathBuf,
    temp_counter: AtomicU64,
}

impl JsonSnapshotStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            temp_counter: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot file for a book.
    #[must_use]
    pub fn snapshot_path(&self, book_id: &BookId) -> PathBuf {
        self.dir.join(format!("{}.json", short_hash(book_id.as_str())))
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self, book_id: &BookId) -> Result<Option<Vec<Chapter>>> {
        let path = self.snapshot_path(book_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(NovelError::cache_io(path, e)),
        };
        let snapshot: SnapshotFile = serde_json::from_str(&content)?;
        Ok(Some(snapshot.chapters))
    }

    fn save(&self, book_id: &BookId, chapters: &[Chapter]) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| NovelError::cache_io(&self.dir, e))?;

        let path = self.snapshot_path(book_id);
        let content = serde_json::to_string_pretty(&SnapshotFile {
            book_id: book_id.clone(),
            saved_at: Utc::now(),
            chapters: chapters.to_vec(),
        })?;

        write_atomic(&path, content.as_bytes(), &self.temp_counter)
            .map_err(|e| NovelError::cache_io(&path, e))?;

        tracing::debug!(book_id = %book_id, chapters = chapters.len(), "Saved chapter-list snapshot");
        Ok(())
    }
}

// =============================================================================
// In memory
// =============================================================================

/// In-memory snapshot store for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    books: RwLock<HashMap<BookId, Vec<Chapter>>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: pre-populate a book's snapshot.
    #[must_use]
    pub fn with_book(self, book_id: BookId, chapters: Vec<Chapter>) -> Self {
        self.books.write().insert(book_id, chapters);
        self
    }

    /// Current snapshot without going through the trait.
    #[must_use]
    pub fn get(&self, book_id: &BookId) -> Option<Vec<Chapter>> {
        self.books.read().get(book_id).cloned()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, book_id: &BookId) -> Result<Option<Vec<Chapter>>> {
        Ok(self.get(book_id))
    }

    fn save(&self, book_id: &BookId, chapters: &[Chapter]) -> Result<()> {
        self.books.write().insert(book_id.clone(), chapters.to_vec());
        Ok(())
    }
}
