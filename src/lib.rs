//! novelcache - chapter content and chapter-list cache engine for web novels.
//!
//! Serves chapter text and chapter indexes from layered caches, refreshes them
//! from a slow remote source without blocking readers, deduplicates concurrent
//! fetches, and preloads upcoming chapters in the background.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use novelcache::core::{Book, Engine, HttpJsonSource, SourceRegistry};
//! use novelcache::storage::{CacheSettings, JsonSnapshotStore};
//!
//! let settings = CacheSettings::default();
//! let source = HttpJsonSource::new(settings.fetch_timeout, &settings.user_agent)?;
//! let engine = Engine::new(
//!     settings,
//!     SourceRegistry::single(Arc::new(source)),
//!     Arc::new(JsonSnapshotStore::new("/var/lib/novelcache/books")),
//! );
//! let chapters = engine.get_chapter_list(&Book::from_source_url(url)).await;
//! ```

// Note: deny (not forbid) to allow #[allow(unsafe_code)] in test helpers for env var manipulation
#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod render;
pub mod storage;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ExitCode, FetchError, NovelError, Result};
