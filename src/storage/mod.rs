//! Storage for configuration, cache tiers, and chapter-list snapshots.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod bounded;
pub mod chapter_list;
pub mod config;
pub mod content;
pub mod paths;
pub mod snapshot;

pub use bounded::{BoundedMap, Expiry};
pub use chapter_list::ChapterListCache;
pub use config::{
    CacheSettings, Config, ConfigSource, ConfigSources, ENV_CACHE_DIR, ENV_CONFIG, ENV_NO_PRELOAD,
    ENV_PRELOAD_WINDOW, ENV_TIMEOUT, PreloadSettings, ResolvedConfig,
};
pub use content::{ContentCacheStore, ContentEntry};
pub use paths::AppPaths;
pub use snapshot::{JsonSnapshotStore, MemorySnapshotStore, SnapshotStore};

/// Write bytes atomically using temp file + rename.
///
/// The temp file sits next to `path` and is named after it, the process id and
/// `counter`, so concurrent writers never share one. It is removed on failure.
pub(crate) fn write_atomic(path: &Path, content: &[u8], counter: &AtomicU64) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(
        ".{}.tmp.{}.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("entry"),
        std::process::id(),
        counter.fetch_add(1, Ordering::Relaxed)
    ));

    let written = (|| {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, path)
    })();
    if written.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    written
}
