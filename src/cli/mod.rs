//! CLI argument parsing and command dispatch.

pub mod args;
pub mod chapters;
pub mod clear;
pub mod read;

use std::sync::Arc;

pub use args::{Cli, Commands, OutputFormat};

use crate::core::engine::Engine;
use crate::core::source::{HttpJsonSource, SourceFetcher, SourceRegistry};
use crate::error::Result;
use crate::storage::config::CacheSettings;
use crate::storage::paths::AppPaths;
use crate::storage::snapshot::{JsonSnapshotStore, SnapshotStore};

/// Build the engine the CLI commands run against: the HTTP JSON source for
/// every host and chapter-list snapshots under the data directory.
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built.
pub fn build_engine(settings: CacheSettings, paths: &AppPaths) -> Result<Engine> {
    let source: Arc<dyn SourceFetcher> =
        Arc::new(HttpJsonSource::new(settings.fetch_timeout, &settings.user_agent)?);
    let snapshots: Arc<dyn SnapshotStore> = Arc::new(JsonSnapshotStore::new(paths.books_dir()));
    Ok(Engine::new(settings, SourceRegistry::single(source), snapshots))
}
