//! Background chapter preloading.
//!
//! Walks the chapter list forward from the chapter being read and warms the
//! content cache. Work goes through a single queue drained by one worker task
//! that runs at most `concurrency` fetches at once and pauses `delay` after
//! each one.
//!
//! A chapter is skipped when it is already fresh in the content cache, when a
//! foreground or preload fetch for it is in flight, or when it is already
//! queued. Queue markers are removed when the task finishes, success or not, so
//! a later pass can retry a failed chapter.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;

use crate::core::models::{Book, BookId, Chapter, ChapterId};
use crate::core::orchestrator::FetchOrchestrator;
use crate::storage::config::PreloadSettings;

type PendingSet = Arc<Mutex<HashSet<(BookId, ChapterId)>>>;

#[derive(Debug)]
struct PreloadTask {
    book: Book,
    chapter_id: ChapterId,
}

/// Rate-limited background content warmer.
#[derive(Debug)]
pub struct Preloader {
    orchestrator: FetchOrchestrator,
    pending: PendingSet,
    sender: Mutex<Option<mpsc::UnboundedSender<PreloadTask>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Preloader {
    /// Start the worker. Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(orchestrator: FetchOrchestrator, settings: &PreloadSettings) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = PendingSet::default();
        let worker = tokio::spawn(run_worker(
            receiver,
            orchestrator.clone(),
            Arc::clone(&pending),
            settings.concurrency.max(1),
            settings.delay,
        ));
        Self {
            orchestrator,
            pending,
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue up to `count` chapters following `chapters[current]`.
    ///
    /// Returns how many chapters were queued. Never blocks on the network.
    pub fn preload_from(&self, book: &Book, chapters: &[Chapter], current: usize, count: usize) -> usize {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            tracing::debug!(book_id = %book.id, "Preloader stopped, ignoring request");
            return 0;
        };

        let mut queued = 0;
        for chapter in chapters.iter().skip(current.saturating_add(1)).take(count) {
            let chapter_id = chapter.id();
            if self.orchestrator.has_fresh_content(&book.id, &chapter_id)
                || self.orchestrator.content_in_flight(&book.id, &chapter_id)
            {
                continue;
            }

            let key = (book.id.clone(), chapter_id.clone());
            if !self.pending.lock().insert(key.clone()) {
                continue;
            }

            let task = PreloadTask {
                book: book.clone(),
                chapter_id,
            };
            if sender.send(task).is_err() {
                self.pending.lock().remove(&key);
                break;
            }
            queued += 1;
        }

        if queued > 0 {
            tracing::debug!(book_id = %book.id, queued, "Queued chapters for preload");
        }
        queued
    }

    /// Chapters queued or being fetched.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether `preload_from` still accepts work.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Stop accepting work and wait for every queued task to finish.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "Preload worker terminated abnormally");
            }
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<PreloadTask>,
    orchestrator: FetchOrchestrator,
    pending: PendingSet,
    concurrency: usize,
    delay: Duration,
) {
    let permits = Arc::new(Semaphore::new(concurrency));

    while let Some(task) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let orchestrator = orchestrator.clone();
        let pending = Arc::clone(&pending);
        tokio::spawn(async move {
            run_task(&orchestrator, &task).await;
            pending.lock().remove(&(task.book.id.clone(), task.chapter_id.clone()));
            tokio::time::sleep(delay).await;
            drop(permit);
        });
    }

    // Drain: every running task holds one permit until it is done.
    let all = u32::try_from(concurrency).unwrap_or(u32::MAX);
    if permits.acquire_many(all).await.is_err() {
        tracing::warn!("Preload permits closed before drain");
    }
}

async fn run_task(orchestrator: &FetchOrchestrator, task: &PreloadTask) {
    let PreloadTask { book, chapter_id } = task;
    // A foreground read may have filled the cache while this task was queued.
    if orchestrator.has_fresh_content(&book.id, chapter_id) {
        return;
    }

    match orchestrator.fetch_content(book, chapter_id).await {
        Ok(_) => tracing::debug!(book_id = %book.id, chapter_id = %chapter_id, "Preloaded chapter"),
        Err(e) => tracing::warn!(
            book_id = %book.id,
            chapter_id = %chapter_id,
            error = %e,
            "Preload failed"
        ),
    }
}
