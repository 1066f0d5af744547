//! Engine harnesses and wire fixtures shared by integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use novelcache::core::engine::Engine;
use novelcache::core::models::{Book, Chapter};
use novelcache::core::orchestrator::FetchOrchestrator;
use novelcache::storage::config::CacheSettings;
use novelcache::storage::snapshot::{MemorySnapshotStore, SnapshotStore};
use novelcache::test_utils::{MockSource, TestDir, make_book};
use serde_json::json;

/// Orchestrator over a [`MockSource`], an in-memory snapshot store and a
/// private content directory.
pub struct OrchestratorHarness {
    pub dir: TestDir,
    pub source: Arc<MockSource>,
    pub snapshots: Arc<MemorySnapshotStore>,
    pub orchestrator: FetchOrchestrator,
    pub book: Book,
}

impl OrchestratorHarness {
    pub fn new(source: MockSource) -> Self {
        Self::with_snapshots(source, MemorySnapshotStore::new())
    }

    pub fn with_snapshots(source: MockSource, snapshots: MemorySnapshotStore) -> Self {
        let dir = TestDir::new();
        let settings = dir.settings();
        Self::build(dir, &settings, source, snapshots)
    }

    pub fn with_settings(
        source: MockSource,
        snapshots: MemorySnapshotStore,
        edit: impl FnOnce(&mut CacheSettings),
    ) -> Self {
        let dir = TestDir::new();
        let mut settings = dir.settings();
        edit(&mut settings);
        Self::build(dir, &settings, source, snapshots)
    }

    fn build(
        dir: TestDir,
        settings: &CacheSettings,
        source: MockSource,
        snapshots: MemorySnapshotStore,
    ) -> Self {
        let source = Arc::new(source);
        let snapshots = Arc::new(snapshots);
        let store: Arc<dyn SnapshotStore> = snapshots.clone();
        let orchestrator = FetchOrchestrator::new(settings, MockSource::registry(&source), store);
        Self {
            dir,
            source,
            snapshots,
            orchestrator,
            book: make_book("B1"),
        }
    }
}

/// Full engine (with preloader) over a [`MockSource`].
pub struct EngineHarness {
    pub dir: TestDir,
    pub source: Arc<MockSource>,
    pub snapshots: Arc<MemorySnapshotStore>,
    pub engine: Engine,
    pub book: Book,
}

impl EngineHarness {
    pub fn new(source: MockSource) -> Self {
        Self::with_settings(source, |_| {})
    }

    pub fn with_settings(source: MockSource, edit: impl FnOnce(&mut CacheSettings)) -> Self {
        let dir = TestDir::new();
        let mut settings = dir.settings();
        edit(&mut settings);
        let source = Arc::new(source);
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let store: Arc<dyn SnapshotStore> = snapshots.clone();
        let engine = Engine::new(settings, MockSource::registry(&source), store);
        Self {
            dir,
            source,
            snapshots,
            engine,
            book: make_book("B1"),
        }
    }
}

/// Body of a chapter index as served by an HTTP JSON source.
pub fn chapter_index(chapters: &[(&str, &str)]) -> serde_json::Value {
    json!({
        "chapters": chapters
            .iter()
            .map(|(title, url)| json!({ "title": title, "url": url }))
            .collect::<Vec<_>>()
    })
}

/// Titles of a chapter list, for compact assertions.
pub fn titles(chapters: &[Chapter]) -> Vec<&str> {
    chapters.iter().map(|c| c.title.as_str()).collect()
}
