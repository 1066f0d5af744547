//! The cache engine: every component wired once, behind the read surface and
//! the cache control surface the host calls.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::core::models::{self, Book, BookId, Chapter, ChapterId, Direction};
use crate::core::orchestrator::FetchOrchestrator;
use crate::core::preload::Preloader;
use crate::core::source::SourceRegistry;
use crate::error::{NovelError, Result};
use crate::storage::config::{CacheSettings, MAX_PRELOAD_WINDOW};
use crate::storage::snapshot::SnapshotStore;

/// Live counts for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub chapter_lists: usize,
    pub throttled_books: usize,
    pub content_in_memory: usize,
    pub list_fetches_in_flight: usize,
    pub content_fetches_in_flight: usize,
    pub preloads_pending: usize,
}

/// Chapter content and chapter-list cache engine.
///
/// Construct once per application and share by reference. Construction spawns
/// the preload worker, so it must happen inside a tokio runtime; call
/// [`Engine::shutdown`] before the runtime goes away to let queued preloads
/// finish.
#[derive(Debug)]
pub struct Engine {
    settings: CacheSettings,
    orchestrator: FetchOrchestrator,
    preloader: Preloader,
}

impl Engine {
    #[must_use]
    pub fn new(
        settings: CacheSettings,
        registry: SourceRegistry,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        let orchestrator = FetchOrchestrator::new(&settings, registry, snapshots);
        let preloader = Preloader::spawn(orchestrator.clone(), &settings.preload);
        tracing::debug!(
            content_dir = %settings.content_dir.display(),
            preload = settings.preload.enabled,
            "Cache engine started"
        );
        Self {
            settings,
            orchestrator,
            preloader,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    #[must_use]
    pub const fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }

    // =========================================================================
    // Read surface
    // =========================================================================

    /// The book's chapter list; empty when nothing is known about it.
    pub async fn get_chapter_list(&self, book: &Book) -> Vec<Chapter> {
        self.orchestrator.get_chapter_list(book).await.to_vec()
    }

    /// Refresh the chapter list from the network and wait for it.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when the refresh fails and no cached list exists.
    pub async fn refresh_chapter_list(&self, book: &Book) -> Result<Vec<Chapter>> {
        Ok(self.orchestrator.refresh_chapter_list(book).await?.to_vec())
    }

    /// Chapter text; queues a preload of the following chapters on success.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when the network fails and no copy is cached.
    pub async fn get_chapter_content(&self, book: &Book, chapter_id: &ChapterId) -> Result<String> {
        let text = self.orchestrator.get_chapter_content(book, chapter_id).await?;
        if self.settings.preload.enabled {
            self.preload_cached(book, chapter_id, self.settings.preload.window);
        }
        Ok(text)
    }

    /// Queue the `count` chapters after `chapter_id` (configured window when
    /// `None`, never more than [`MAX_PRELOAD_WINDOW`]). Returns how many were
    /// queued.
    pub async fn preload_from(&self, book: &Book, chapter_id: &ChapterId, count: Option<usize>) -> usize {
        let count = count
            .unwrap_or(self.settings.preload.window)
            .min(MAX_PRELOAD_WINDOW);
        let chapters = self.orchestrator.get_chapter_list(book).await;
        let Some(current) = models::position_of(&chapters, chapter_id) else {
            tracing::debug!(book_id = %book.id, chapter_id = %chapter_id, "Chapter not in list, nothing to preload");
            return 0;
        };
        self.preloader.preload_from(book, &chapters, current, count)
    }

    /// Preload using only the list already in memory or on disk.
    fn preload_cached(&self, book: &Book, chapter_id: &ChapterId, count: usize) -> usize {
        let Some(chapters) = self.orchestrator.list_candidate(&book.id) else {
            return 0;
        };
        models::position_of(&chapters, chapter_id)
            .map_or(0, |current| self.preloader.preload_from(book, &chapters, current, count))
    }

    /// The chapter before or after `chapter_id` in list order.
    pub async fn adjacent_chapter(
        &self,
        book: &Book,
        chapter_id: &ChapterId,
        direction: Direction,
    ) -> Option<Chapter> {
        let chapters = self.orchestrator.get_chapter_list(book).await;
        models::adjacent(&chapters, chapter_id, direction).cloned()
    }

    /// Like [`Engine::adjacent_chapter`], but distinguishes "unknown chapter"
    /// from "no neighbour".
    ///
    /// # Errors
    ///
    /// Returns [`NovelError::ChapterNotInList`] if the chapter is not listed.
    pub async fn try_adjacent_chapter(
        &self,
        book: &Book,
        chapter_id: &ChapterId,
        direction: Direction,
    ) -> Result<Option<Chapter>> {
        let chapters = self.orchestrator.get_chapter_list(book).await;
        if models::position_of(&chapters, chapter_id).is_none() {
            return Err(NovelError::ChapterNotInList {
                book: book.id.to_string(),
                chapter: chapter_id.to_string(),
            });
        }
        Ok(models::adjacent(&chapters, chapter_id, direction).cloned())
    }

    // =========================================================================
    // Cache control surface
    // =========================================================================

    /// Drop cached content, the cached list and the throttle record of a book.
    ///
    /// # Errors
    ///
    /// Returns error if cached files cannot be removed.
    pub fn clear_book_cache(&self, book_id: &BookId) -> Result<()> {
        self.orchestrator.clear_book(book_id)?;
        tracing::info!(book_id = %book_id, "Cleared book cache");
        Ok(())
    }

    /// Drop everything cached for every book.
    ///
    /// # Errors
    ///
    /// Returns error if cached files cannot be removed.
    pub fn clear_all_cache(&self) -> Result<()> {
        self.orchestrator.clear_all()?;
        tracing::info!("Cleared all caches");
        Ok(())
    }

    /// Directory holding cached chapter content.
    #[must_use]
    pub fn cache_directory_path(&self) -> &Path {
        self.orchestrator.content_store().directory()
    }

    /// Current counts. Expired lists and throttle records are purged first.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.orchestrator.list_cache().purge_expired();
        self.orchestrator.throttle().purge_expired();
        EngineStats {
            chapter_lists: self.orchestrator.list_cache().len(),
            throttled_books: self.orchestrator.throttle().len(),
            content_in_memory: self.orchestrator.content_store().memory_len(),
            list_fetches_in_flight: self.orchestrator.lists_in_flight(),
            content_fetches_in_flight: self.orchestrator.contents_in_flight(),
            preloads_pending: self.preloader.pending_count(),
        }
    }

    /// Stop accepting preload work, then wait for queued preloads and any
    /// background refresh still in flight.
    pub async fn shutdown(&self) {
        self.preloader.shutdown().await;
        self.orchestrator.settle().await;
        tracing::debug!("Cache engine stopped");
    }
}
