//! Application paths for config, cache, and data.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Application paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
    /// Cache directory.
    pub cache: PathBuf,
    /// Data directory.
    pub data: PathBuf,
}

impl AppPaths {
    /// Create paths for the novelcache application.
    #[must_use]
    pub fn new() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("org", "novelcache", "novelcache") {
            Self {
                config: proj_dirs.config_dir().to_path_buf(),
                cache: proj_dirs.cache_dir().to_path_buf(),
                data: proj_dirs.data_dir().to_path_buf(),
            }
        } else {
            // Fallback to home directory
            let home = directories::BaseDirs::new()
                .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
            Self {
                config: home.join(".config/novelcache"),
                cache: home.join(".cache/novelcache"),
                data: home.join(".local/share/novelcache"),
            }
        }
    }

    /// Paths rooted under a single directory (tests, portable installs).
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config: root.join("config"),
            cache: root.join("cache"),
            data: root.join("data"),
        }
    }

    /// Replace the cache directory (from `cache_dir` config or env).
    #[must_use]
    pub fn with_cache_dir(mut self, cache: impl Into<PathBuf>) -> Self {
        self.cache = cache.into();
        self
    }

    /// Path to the config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Root of the chapter-content cache.
    #[must_use]
    pub fn content_dir(&self) -> PathBuf {
        self.cache.join("content")
    }

    /// Directory of persisted chapter-list snapshots.
    #[must_use]
    pub fn books_dir(&self) -> PathBuf {
        self.data.join("books")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
