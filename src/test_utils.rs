//! Test utilities for novelcache.
//!
//! Provides a scripted [`MockSource`], test data factories and an isolated
//! [`TestDir`] for use across unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use novelcache::test_utils::*;
//!
//! let source = MockSource::new().with_chapters(make_chapters(10));
//! let dir = TestDir::new();
//! let settings = dir.settings();
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::core::models::{Book, Chapter, ChapterId};
use crate::core::source::{FetchResult, SourceFetcher, SourceRegistry};
use crate::error::FetchError;
use crate::storage::config::{CacheSettings, PreloadSettings};

// =============================================================================
// Test Data Factories
// =============================================================================

/// Chapters `("C1", "u1")` through `("Cn", "un")`.
#[must_use]
pub fn make_chapters(n: usize) -> Vec<Chapter> {
    (1..=n)
        .map(|i| Chapter::new(format!("C{i}"), format!("u{i}")))
        .collect()
}

/// A book with an explicit id and a fake source URL.
#[must_use]
pub fn make_book(id: &str) -> Book {
    Book::new(id, format!("https://novels.example/{id}"))
}

/// Text the mock source returns for a chapter unless told otherwise.
#[must_use]
pub fn default_chapter_text(chapter_id: &ChapterId) -> String {
    format!("Text of {chapter_id}")
}

// =============================================================================
// Mock Source
// =============================================================================

/// Scripted [`SourceFetcher`] that counts every call.
///
/// - Chapter list: scripted responses are consumed first, then the standing
///   response (empty list by default).
/// - Content: per-chapter text or failure, otherwise a global failure, otherwise
///   [`default_chapter_text`].
/// - Latency applies to every call and honours paused tokio time.
pub struct MockSource {
    name: String,
    list: Mutex<FetchResult<Vec<Chapter>>>,
    scripted_lists: Mutex<VecDeque<FetchResult<Vec<Chapter>>>>,
    content: Mutex<HashMap<ChapterId, FetchResult<String>>>,
    content_error: Mutex<Option<FetchError>>,
    latency: Mutex<Duration>,
    list_calls: AtomicUsize,
    content_calls: AtomicUsize,
    content_calls_by_chapter: Mutex<HashMap<ChapterId, usize>>,
}

impl MockSource {
    #[must_use]
    pub fn new() -> Self {
        Self::named("mock")
    }

    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            list: Mutex::new(Ok(Vec::new())),
            scripted_lists: Mutex::new(VecDeque::new()),
            content: Mutex::new(HashMap::new()),
            content_error: Mutex::new(None),
            latency: Mutex::new(Duration::ZERO),
            list_calls: AtomicUsize::new(0),
            content_calls: AtomicUsize::new(0),
            content_calls_by_chapter: Mutex::new(HashMap::new()),
        }
    }

    /// Builder: standing chapter-list response.
    #[must_use]
    pub fn with_chapters(self, chapters: Vec<Chapter>) -> Self {
        self.set_chapters(chapters);
        self
    }

    /// Builder: delay applied to every call.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    /// Wrap in a registry that routes every book here.
    #[must_use]
    pub fn registry(source: &Arc<Self>) -> SourceRegistry {
        let fetcher: Arc<dyn SourceFetcher> = Arc::clone(source) as Arc<dyn SourceFetcher>;
        SourceRegistry::single(fetcher)
    }

    pub fn set_chapters(&self, chapters: Vec<Chapter>) {
        *self.list.lock() = Ok(chapters);
    }

    /// Make every later chapter-list call fail.
    pub fn set_list_error(&self, error: FetchError) {
        *self.list.lock() = Err(error);
    }

    /// Queue a one-shot chapter-list response.
    pub fn push_list_response(&self, response: FetchResult<Vec<Chapter>>) {
        self.scripted_lists.lock().push_back(response);
    }

    pub fn set_content(&self, chapter_id: &ChapterId, text: &str) {
        self.content
            .lock()
            .insert(chapter_id.clone(), Ok(text.to_string()));
    }

    /// Make one chapter fail.
    pub fn fail_chapter(&self, chapter_id: &ChapterId, error: FetchError) {
        self.content.lock().insert(chapter_id.clone(), Err(error));
    }

    /// Make every chapter without a scripted response fail.
    pub fn fail_all_content(&self, error: FetchError) {
        *self.content_error.lock() = Some(error);
    }

    /// Drop every scripted content response and global failure.
    pub fn reset_content(&self) {
        self.content.lock().clear();
        *self.content_error.lock() = None;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn content_calls_for(&self, chapter_id: &ChapterId) -> usize {
        self.content_calls_by_chapter
            .lock()
            .get(chapter_id)
            .copied()
            .unwrap_or(0)
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn next_list(&self) -> FetchResult<Vec<Chapter>> {
        if let Some(scripted) = self.scripted_lists.lock().pop_front() {
            return scripted;
        }
        self.list.lock().clone()
    }

    fn content_for(&self, chapter_id: &ChapterId) -> FetchResult<String> {
        if let Some(scripted) = self.content.lock().get(chapter_id) {
            return scripted.clone();
        }
        if let Some(error) = self.content_error.lock().clone() {
            return Err(error);
        }
        Ok(default_chapter_text(chapter_id))
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceFetcher for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_chapter_list<'a>(&'a self, _book: &'a Book) -> BoxFuture<'a, FetchResult<Vec<Chapter>>> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.delay().await;
            self.next_list()
        })
    }

    fn fetch_chapter_content<'a>(
        &'a self,
        _book: &'a Book,
        chapter_id: &'a ChapterId,
    ) -> BoxFuture<'a, FetchResult<String>> {
        Box::pin(async move {
            self.content_calls.fetch_add(1, Ordering::SeqCst);
            *self
                .content_calls_by_chapter
                .lock()
                .entry(chapter_id.clone())
                .or_insert(0) += 1;
            self.delay().await;
            self.content_for(chapter_id)
        })
    }
}

// =============================================================================
// Temp Directory Utilities
// =============================================================================

/// A temporary directory for tests with automatic cleanup.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Content cache root inside the directory.
    #[must_use]
    pub fn content_dir(&self) -> PathBuf {
        self.inner.path().join("content")
    }

    /// Default settings rooted here, with a near-zero preload delay.
    #[must_use]
    pub fn settings(&self) -> CacheSettings {
        let mut settings = CacheSettings::in_dir(self.content_dir());
        settings.preload = PreloadSettings {
            delay: Duration::from_millis(1),
            ..PreloadSettings::default()
        };
        settings
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
