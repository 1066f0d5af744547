//! Fetch orchestration.
//!
//! Decides, per call, whether to serve from a cache tier, go to the network, or
//! fall back to stale data.
//!
//! # Chapter lists
//!
//! ```text
//! candidate = list cache  ->  persisted snapshot (warms the list cache)
//! if no candidate or throttle says due: start deduplicated network refresh
//! candidate present  -> return it now, refresh finishes in the background
//! no candidate       -> wait for the refresh; empty list if it fails
//! ```
//!
//! A refresh writes through to the list cache and the snapshot only when the
//! source returns a non-empty list. Every completed attempt (success, empty or
//! failure) starts a new throttle window.
//!
//! # Chapter content
//!
//! Strict chain: fresh cache -> network (deduplicated, write-through) -> stale
//! cache -> error. Nothing is retried here.
//!
//! # Clearing
//!
//! A fetch that was already in flight when its book was cleared still answers
//! its callers, but its write-through is discarded.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::core::dedup::{RequestDeduplicator, SharedFetch};
use crate::core::models::{Book, BookId, ChapterId, ChapterList};
use crate::core::source::{FetchResult, SourceRegistry};
use crate::core::throttle::FetchThrottle;
use crate::error::{FetchError, Result};
use crate::storage::chapter_list::ChapterListCache;
use crate::storage::config::CacheSettings;
use crate::storage::content::ContentCacheStore;
use crate::storage::snapshot::SnapshotStore;

/// Outcome of one network chapter-list fetch, shared by every joined caller.
pub type ListOutcome = std::result::Result<ChapterList, FetchError>;
/// Outcome of one network content fetch, shared by every joined caller.
pub type ContentOutcome = std::result::Result<Arc<str>, FetchError>;

type ContentKey = (BookId, ChapterId);

/// Clear counters: one for `clear_all`, one per cleared book.
#[derive(Debug, Default)]
struct ClearEpochs {
    all: u64,
    books: HashMap<BookId, u64>,
}

impl ClearEpochs {
    fn stamp(&self, book_id: &BookId) -> (u64, u64) {
        (self.all, self.books.get(book_id).copied().unwrap_or(0))
    }
}

struct Inner {
    registry: SourceRegistry,
    lists: ChapterListCache,
    throttle: FetchThrottle,
    snapshots: Arc<dyn SnapshotStore>,
    content: ContentCacheStore,
    list_requests: RequestDeduplicator<BookId, ListOutcome>,
    content_requests: RequestDeduplicator<ContentKey, ContentOutcome>,
    fetch_timeout: Duration,
    clears: RwLock<ClearEpochs>,
}

/// Cache/fetch policy engine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct FetchOrchestrator {
    inner: Arc<Inner>,
}

impl FetchOrchestrator {
    /// Build every cache tier from `settings`.
    #[must_use]
    pub fn new(
        settings: &CacheSettings,
        registry: SourceRegistry,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                lists: ChapterListCache::new(
                    settings.chapter_list_max_entries,
                    settings.chapter_list_idle,
                ),
                throttle: FetchThrottle::new(settings.throttle_max_entries, settings.refresh_cooldown),
                snapshots,
                content: ContentCacheStore::new(
                    &settings.content_dir,
                    settings.content_ttl,
                    settings.content_memory_entries,
                ),
                list_requests: RequestDeduplicator::new(),
                content_requests: RequestDeduplicator::new(),
                fetch_timeout: settings.fetch_timeout,
                clears: RwLock::new(ClearEpochs::default()),
            }),
        }
    }

    // =========================================================================
    // Chapter list
    // =========================================================================

    /// Serve a book's chapter list, refreshing from the network when due.
    ///
    /// Never fails: an empty list is the terminal answer when no tier has data.
    pub async fn get_chapter_list(&self, book: &Book) -> ChapterList {
        let candidate = self.list_candidate(&book.id);

        let Some(candidate) = candidate else {
            tracing::debug!(book_id = %book.id, "No cached chapter list, waiting for network");
            return match self.refresh_list(book).await {
                Ok(list) if !list.is_empty() => list,
                _ => self.list_candidate(&book.id).unwrap_or_else(empty_list),
            };
        };

        if self.inner.throttle.should_check_network(&book.id) {
            tracing::debug!(
                book_id = %book.id,
                chapters = candidate.len(),
                "Serving cached chapter list, refreshing in background"
            );
            // The refresh is spawned by the deduplicator; dropping the handle
            // does not cancel it.
            drop(self.refresh_list(book));
        } else {
            tracing::debug!(book_id = %book.id, chapters = candidate.len(), "Serving cached chapter list");
        }
        candidate
    }

    /// Force a network refresh and wait for it.
    ///
    /// # Errors
    ///
    /// Returns the fetch error only when the refresh failed and no cached or
    /// persisted list exists.
    pub async fn refresh_chapter_list(&self, book: &Book) -> Result<ChapterList> {
        match self.refresh_list(book).await {
            Ok(list) if !list.is_empty() => Ok(list),
            Ok(_) => Ok(self.list_candidate(&book.id).unwrap_or_else(empty_list)),
            Err(err) => self.list_candidate(&book.id).ok_or_else(|| err.into()),
        }
    }

    /// Best list available without the network.
    ///
    /// A snapshot hit warms the list cache.
    pub fn list_candidate(&self, book_id: &BookId) -> Option<ChapterList> {
        if let Some(list) = self.inner.lists.get(book_id).filter(|l| !l.is_empty()) {
            return Some(list);
        }

        match self.inner.snapshots.load(book_id) {
            Ok(Some(chapters)) if !chapters.is_empty() => {
                tracing::debug!(book_id = %book_id, chapters = chapters.len(), "Loaded chapter list from snapshot");
                let list: ChapterList = chapters.into();
                self.inner.lists.put(book_id.clone(), Arc::clone(&list));
                Some(list)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(book_id = %book_id, error = %e, "Failed to load chapter-list snapshot");
                None
            }
        }
    }

    /// Join or start the deduplicated network refresh for a book.
    fn refresh_list(&self, book: &Book) -> SharedFetch<ListOutcome> {
        let this = self.clone();
        let book = book.clone();
        self.inner
            .list_requests
            .get_or_create(book.id.clone(), move || async move { this.fetch_list_now(&book).await })
    }

    async fn fetch_list_now(&self, book: &Book) -> ListOutcome {
        let started = Instant::now();
        let stamp = self.clear_stamp(&book.id);
        let outcome = match self.inner.registry.resolve(book) {
            Ok(fetcher) => self.bounded(fetcher.fetch_chapter_list(book)).await,
            Err(e) => Err(e),
        };
        let elapsed_ms = elapsed_ms(started);
        let list = match outcome {
            Ok(chapters) if !chapters.is_empty() => Ok(ChapterList::from(chapters)),
            other => other.map(|_| empty_list()),
        };

        let kept = self.write_through(&book.id, stamp, || {
            self.inner.throttle.record_checked(&book.id);
            if let Ok(list) = &list
                && !list.is_empty()
            {
                self.inner.lists.put(book.id.clone(), Arc::clone(list));
            }
        });
        if !kept {
            tracing::debug!(book_id = %book.id, "Book cleared during list fetch, not caching result");
        }

        match list {
            Ok(list) if !list.is_empty() => {
                if let Err(e) = self.inner.snapshots.save(&book.id, &list) {
                    tracing::warn!(book_id = %book.id, error = %e, "Failed to persist chapter-list snapshot");
                }
                tracing::info!(book_id = %book.id, chapters = list.len(), elapsed_ms, "Refreshed chapter list");
                Ok(list)
            }
            Ok(_) => {
                tracing::info!(book_id = %book.id, elapsed_ms, "Source returned no chapters, keeping cached list");
                Ok(empty_list())
            }
            Err(e) => {
                tracing::warn!(book_id = %book.id, error = %e, elapsed_ms, "Chapter list fetch failed");
                Err(e)
            }
        }
    }

    // =========================================================================
    // Chapter content
    // =========================================================================

    /// Serve chapter text: fresh cache, network, stale cache, then error.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when the network fails and nothing is cached.
    pub async fn get_chapter_content(&self, book: &Book, chapter_id: &ChapterId) -> Result<String> {
        if let Some(text) = self.inner.content.get(&book.id, chapter_id) {
            tracing::debug!(book_id = %book.id, chapter_id = %chapter_id, "Content cache hit");
            return Ok(text);
        }

        match self.fetch_content(book, chapter_id).await {
            Ok(text) => Ok(text.to_string()),
            Err(err) => {
                if let Some(stale) = self.inner.content.get_fallback(&book.id, chapter_id) {
                    tracing::warn!(
                        book_id = %book.id,
                        chapter_id = %chapter_id,
                        error = %err,
                        "Content fetch failed, serving stale copy"
                    );
                    return Ok(stale);
                }
                Err(err.into())
            }
        }
    }

    /// Join or start the deduplicated network fetch of one chapter.
    ///
    /// A successful fetch is written through to the content cache before any
    /// caller sees it.
    pub fn fetch_content(&self, book: &Book, chapter_id: &ChapterId) -> SharedFetch<ContentOutcome> {
        let this = self.clone();
        let book = book.clone();
        let chapter = chapter_id.clone();
        self.inner.content_requests.get_or_create(
            (book.id.clone(), chapter_id.clone()),
            move || async move { this.fetch_content_now(&book, &chapter).await },
        )
    }

    async fn fetch_content_now(&self, book: &Book, chapter_id: &ChapterId) -> ContentOutcome {
        let started = Instant::now();
        let stamp = self.clear_stamp(&book.id);
        let fetcher = self.inner.registry.resolve(book)?;
        let text = self
            .bounded(fetcher.fetch_chapter_content(book, chapter_id))
            .await?;
        if text.trim().is_empty() {
            return Err(FetchError::Parse(format!("empty chapter body for {chapter_id}")));
        }

        let kept = self.write_through(&book.id, stamp, || {
            self.inner.content.put(&book.id, chapter_id, &text);
        });
        if !kept {
            tracing::debug!(
                book_id = %book.id,
                chapter_id = %chapter_id,
                "Book cleared during content fetch, not caching result"
            );
        }
        tracing::info!(
            book_id = %book.id,
            chapter_id = %chapter_id,
            bytes = text.len(),
            elapsed_ms = elapsed_ms(started),
            "Fetched chapter content"
        );
        Ok(Arc::from(text))
    }

    /// Whether a fresh copy of the chapter is cached.
    pub fn has_fresh_content(&self, book_id: &BookId, chapter_id: &ChapterId) -> bool {
        self.inner.content.contains_fresh(book_id, chapter_id)
    }

    /// Whether a network fetch of the chapter is in flight.
    pub fn content_in_flight(&self, book_id: &BookId, chapter_id: &ChapterId) -> bool {
        self.inner
            .content_requests
            .contains(&(book_id.clone(), chapter_id.clone()))
    }

    // =========================================================================
    // Cache control
    // =========================================================================

    /// Drop a book's content, cached list and throttle record.
    ///
    /// The persisted snapshot is left alone.
    ///
    /// # Errors
    ///
    /// Returns error if the book's content directory cannot be removed.
    pub fn clear_book(&self, book_id: &BookId) -> Result<()> {
        {
            let mut clears = self.inner.clears.write();
            let epoch = clears.books.entry(book_id.clone()).or_insert(0);
            *epoch = epoch.wrapping_add(1);
        }
        self.inner.lists.invalidate(book_id);
        self.inner.throttle.forget(book_id);
        self.inner.content.clear(book_id)
    }

    /// Drop every cached list, throttle record and chapter.
    ///
    /// # Errors
    ///
    /// Returns error if the content directory cannot be emptied.
    pub fn clear_all(&self) -> Result<()> {
        {
            let mut clears = self.inner.clears.write();
            clears.all = clears.all.wrapping_add(1);
        }
        self.inner.lists.invalidate_all();
        self.inner.throttle.clear();
        self.inner.content.clear_all()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub fn content_store(&self) -> &ContentCacheStore {
        &self.inner.content
    }

    #[must_use]
    pub fn list_cache(&self) -> &ChapterListCache {
        &self.inner.lists
    }

    #[must_use]
    pub fn throttle(&self) -> &FetchThrottle {
        &self.inner.throttle
    }

    #[must_use]
    pub fn lists_in_flight(&self) -> usize {
        self.inner.list_requests.in_flight_count()
    }

    #[must_use]
    pub fn contents_in_flight(&self) -> usize {
        self.inner.content_requests.in_flight_count()
    }

    /// Wait for every network fetch in flight right now.
    pub async fn settle(&self) {
        let lists = self.inner.list_requests.in_flight();
        let contents = self.inner.content_requests.in_flight();
        futures::future::join(
            futures::future::join_all(lists),
            futures::future::join_all(contents),
        )
        .await;
    }

    fn clear_stamp(&self, book_id: &BookId) -> (u64, u64) {
        self.inner.clears.read().stamp(book_id)
    }

    /// Run `write` unless the book was cleared since `stamp` was taken.
    ///
    /// The read guard is held across `write`, so a concurrent clear either
    /// lands before the check or removes what `write` stored.
    fn write_through(&self, book_id: &BookId, stamp: (u64, u64), write: impl FnOnce()) -> bool {
        let clears = self.inner.clears.read();
        if clears.stamp(book_id) != stamp {
            return false;
        }
        write();
        true
    }

    async fn bounded<T>(&self, fetch: impl Future<Output = FetchResult<T>>) -> FetchResult<T> {
        let limit = self.inner.fetch_timeout;
        tokio::time::timeout(limit, fetch)
            .await
            .unwrap_or(Err(FetchError::Timeout {
                seconds: limit.as_secs(),
            }))
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("registry", &self.inner.registry)
            .field("lists", &self.inner.lists)
            .field("throttle", &self.inner.throttle)
            .field("content", &self.inner.content)
            .field("fetch_timeout", &self.inner.fetch_timeout)
            .finish_non_exhaustive()
    }
}

fn empty_list() -> ChapterList {
    Arc::from(Vec::new())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
