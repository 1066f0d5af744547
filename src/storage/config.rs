//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux/macOS: `~/.config/novelcache/config.toml`
//! - Windows: `%APPDATA%/novelcache/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `NOVELCACHE_CONFIG`: Override config file path
//! - `NOVELCACHE_CACHE_DIR`: Cache directory
//! - `NOVELCACHE_TIMEOUT`: Network timeout in seconds
//! - `NOVELCACHE_PRELOAD_WINDOW`: Chapters to preload ahead of the current one
//! - `NOVELCACHE_NO_PRELOAD`: Disable preloading (1, true, yes)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::Cli;
use crate::core::http;
use crate::error::{NovelError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "NOVELCACHE_CONFIG";
/// Environment variable for the cache directory.
pub const ENV_CACHE_DIR: &str = "NOVELCACHE_CACHE_DIR";
/// Environment variable for timeout in seconds.
pub const ENV_TIMEOUT: &str = "NOVELCACHE_TIMEOUT";
/// Environment variable for the preload window.
pub const ENV_PRELOAD_WINDOW: &str = "NOVELCACHE_PRELOAD_WINDOW";
/// Environment variable to disable preloading.
pub const ENV_NO_PRELOAD: &str = "NOVELCACHE_NO_PRELOAD";

const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_PRELOAD_CONCURRENCY: usize = 8;
/// Upper bound on chapters queued by one preload pass.
pub const MAX_PRELOAD_WINDOW: usize = 50;

// =============================================================================
// Engine Settings
// =============================================================================

/// Preloader tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadSettings {
    pub enabled: bool,
    /// Chapters ahead of the current one.
    pub window: usize,
    /// Pause between two preload tasks.
    pub delay: Duration,
    /// Worker pool size.
    pub concurrency: usize,
}

impl Default for PreloadSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 3,
            delay: Duration::from_millis(300),
            concurrency: 1,
        }
    }
}

/// Plain-data settings consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Root of the on-disk content cache.
    pub content_dir: PathBuf,
    pub content_ttl: Duration,
    pub content_memory_entries: usize,
    pub chapter_list_max_entries: usize,
    pub chapter_list_idle: Duration,
    pub throttle_max_entries: usize,
    pub refresh_cooldown: Duration,
    /// Bound on every source call.
    pub fetch_timeout: Duration,
    pub user_agent: String,
    pub preload: PreloadSettings,
}

impl CacheSettings {
    /// Default settings with the content cache rooted at `content_dir`.
    #[must_use]
    pub fn in_dir(content_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(&Config::default(), content_dir.into())
    }

    fn from_config(config: &Config, content_dir: PathBuf) -> Self {
        let cache = &config.cache;
        Self {
            content_dir,
            content_ttl: Duration::from_secs(cache.content_ttl_secs),
            content_memory_entries: cache.content_memory_entries,
            chapter_list_max_entries: cache.chapter_list_max_entries,
            chapter_list_idle: Duration::from_secs(cache.chapter_list_idle_secs),
            throttle_max_entries: cache.throttle_max_entries,
            refresh_cooldown: Duration::from_secs(cache.refresh_cooldown_secs),
            fetch_timeout: Duration::from_secs(config.network.timeout_seconds),
            user_agent: config.network.effective_user_agent(),
            preload: PreloadSettings {
                enabled: config.preload.enabled,
                window: config.preload.window,
                delay: Duration::from_millis(config.preload.delay_ms),
                concurrency: config.preload.concurrency,
            },
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::in_dir(AppPaths::new().content_dir())
    }
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub settings: CacheSettings,
    pub paths: AppPaths,
    /// Log level from the config file (CLI and env are handled by logging).
    pub log_level: Option<String>,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub cache_dir: ConfigSource,
    pub timeout: ConfigSource,
    pub preload_window: ConfigSource,
    pub preload_enabled: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables, and config file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file exists but is invalid
    /// - Any resolved value is out of range
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let config = Self::load_config(cli.config.as_deref())?;
        config.validate()?;

        let mut sources = ConfigSources::default();
        let paths = Self::resolve_paths(cli, &config, &mut sources.cache_dir);
        let timeout = Self::resolve_timeout(cli, &config, &mut sources.timeout);
        validate_timeout(timeout)?;
        let window = Self::resolve_preload_window(&config, &mut sources.preload_window);
        validate_preload_window(window)?;
        let preload_enabled = Self::resolve_preload_enabled(&config, &mut sources.preload_enabled);

        let mut settings = CacheSettings::from_config(&config, paths.content_dir());
        settings.fetch_timeout = Duration::from_secs(timeout);
        settings.preload.window = window;
        settings.preload.enabled = preload_enabled;

        Ok(Self {
            settings,
            paths,
            log_level: config.general.log_level,
            sources,
        })
    }

    /// Load config file: `--config`, then `NOVELCACHE_CONFIG`, then the default path.
    fn load_config(cli_path: Option<&Path>) -> Result<Config> {
        if let Some(path) = cli_path {
            return Config::load_from(path);
        }
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return Config::load_from(Path::new(&path));
        }
        Config::load()
    }

    fn resolve_paths(cli: &Cli, config: &Config, source: &mut ConfigSource) -> AppPaths {
        let paths = AppPaths::new();

        // 1. CLI flag
        if let Some(ref dir) = cli.cache_dir {
            *source = ConfigSource::Cli;
            return paths.with_cache_dir(dir);
        }

        // 2. Environment variable
        if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
            if !dir.trim().is_empty() {
                *source = ConfigSource::Env;
                return paths.with_cache_dir(dir.trim());
            }
        }

        // 3. Config file
        if let Some(ref dir) = config.general.cache_dir {
            *source = ConfigSource::ConfigFile;
            return paths.with_cache_dir(dir);
        }

        // 4. Default
        *source = ConfigSource::Default;
        paths
    }

    fn resolve_timeout(cli: &Cli, config: &Config, source: &mut ConfigSource) -> u64 {
        // 1. CLI --timeout flag
        if let Some(timeout) = cli.timeout {
            *source = ConfigSource::Cli;
            return timeout;
        }

        // 2. Environment variable
        if let Some(timeout) = parse_env::<u64>(ENV_TIMEOUT) {
            *source = ConfigSource::Env;
            return timeout;
        }

        // 3. Config file
        *source = ConfigSource::ConfigFile;
        config.network.timeout_seconds
    }

    fn resolve_preload_window(config: &Config, source: &mut ConfigSource) -> usize {
        if let Some(window) = parse_env::<usize>(ENV_PRELOAD_WINDOW) {
            *source = ConfigSource::Env;
            return window;
        }
        *source = ConfigSource::ConfigFile;
        config.preload.window
    }

    fn resolve_preload_enabled(config: &Config, source: &mut ConfigSource) -> bool {
        if is_env_truthy(ENV_NO_PRELOAD) {
            *source = ConfigSource::Env;
            return false;
        }
        *source = ConfigSource::ConfigFile;
        config.preload.enabled
    }
}

/// Parse an environment variable, ignoring unset, empty and malformed values.
fn parse_env<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.trim().parse().ok())
}

/// Check if an environment variable is set to a truthy value.
fn is_env_truthy(var: &str) -> bool {
    std::env::var(var)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn validate_timeout(seconds: u64) -> Result<()> {
    if seconds == 0 || seconds > MAX_TIMEOUT_SECS {
        return Err(NovelError::Config(format!(
            "Timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds"
        )));
    }
    Ok(())
}

fn validate_preload_window(window: usize) -> Result<()> {
    if window > MAX_PRELOAD_WINDOW {
        return Err(NovelError::Config(format!(
            "Preload window must be at most {MAX_PRELOAD_WINDOW} chapters"
        )));
    }
    Ok(())
}

// =============================================================================
// Config File
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Cache sizing and freshness.
    pub cache: CacheConfig,
    /// Network settings.
    pub network: NetworkConfig,
    /// Preloader settings.
    pub preload: PreloadConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Cache directory override.
    pub cache_dir: Option<PathBuf>,
    /// Default log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

/// Cache sizing and freshness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Fresh window for chapter text.
    pub content_ttl_secs: u64,
    /// Memory tier bound for chapter text.
    pub content_memory_entries: usize,
    /// LRU bound for the chapter-list cache.
    pub chapter_list_max_entries: usize,
    /// Access-based expiry for cached chapter lists.
    pub chapter_list_idle_secs: u64,
    /// LRU bound for the refresh throttle.
    pub throttle_max_entries: usize,
    /// Minimum time between two network refreshes of one book.
    pub refresh_cooldown_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            content_ttl_secs: 7 * 24 * 3600,
            content_memory_entries: 256,
            chapter_list_max_entries: 64,
            chapter_list_idle_secs: 3600,
            throttle_max_entries: 1024,
            refresh_cooldown_secs: 600,
        }
    }
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Timeout for every source call in seconds.
    pub timeout_seconds: u64,
    /// User agent override.
    pub user_agent: Option<String>,
}

impl NetworkConfig {
    #[must_use]
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(crate::core::http::default_user_agent)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: http::DEFAULT_TIMEOUT.as_secs(),
            user_agent: None,
        }
    }
}

/// Preloader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    pub enabled: bool,
    /// Chapters ahead of the current one.
    pub window: usize,
    /// Delay between two preload tasks in milliseconds.
    pub delay_ms: u64,
    /// Worker pool size.
    pub concurrency: usize,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 3,
            delay_ms: 300,
            concurrency: 1,
        }
    }
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| NovelError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| NovelError::Config(format!("Failed to serialize config: {e}")))?;

        fs::write(path, content)?;
        tracing::debug!(?path, "Config file saved");
        Ok(())
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    /// Validate configuration values.
    ///
    /// Checks that:
    /// - Timeout is within reasonable bounds (1-300 seconds)
    /// - Every capacity is non-zero
    /// - Preload concurrency is 1-8 and the window at most 50
    pub fn validate(&self) -> Result<()> {
        validate_timeout(self.network.timeout_seconds)?;

        let capacities = [
            ("cache.content_memory_entries", self.cache.content_memory_entries),
            ("cache.chapter_list_max_entries", self.cache.chapter_list_max_entries),
            ("cache.throttle_max_entries", self.cache.throttle_max_entries),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(NovelError::Config(format!("{name} must be greater than 0")));
            }
        }

        if self.preload.concurrency == 0 || self.preload.concurrency > MAX_PRELOAD_CONCURRENCY {
            return Err(NovelError::Config(format!(
                "Preload concurrency must be between 1 and {MAX_PRELOAD_CONCURRENCY}"
            )));
        }
        validate_preload_window(self.preload.window)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::OutputFormat;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_ENV: [&str; 5] = [
        ENV_CONFIG,
        ENV_CACHE_DIR,
        ENV_TIMEOUT,
        ENV_PRELOAD_WINDOW,
        ENV_NO_PRELOAD,
    ];

    #[allow(unsafe_code)]
    fn set_env(key: &str, value: &str) {
        // SAFETY: env-mutating tests hold ENV_LOCK
        unsafe { std::env::set_var(key, value) };
    }

    #[allow(unsafe_code)]
    fn remove_env(key: &str) {
        // SAFETY: env-mutating tests hold ENV_LOCK
        unsafe { std::env::remove_var(key) };
    }

    fn clean_env() -> std::sync::MutexGuard<'static, ()> {
        let guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for key in ALL_ENV {
            remove_env(key);
        }
        guard
    }

    fn make_test_cli(config: &Path) -> Cli {
        Cli {
            command: None,
            format: OutputFormat::Human,
            config: Some(config.to_path_buf()),
            cache_dir: None,
            timeout: None,
            log_level: None,
            json_output: false,
            verbose: false,
        }
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.network.timeout_seconds, 30);
        assert_eq!(config.cache.content_ttl_secs, 604_800);
        assert_eq!(config.preload.window, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.cache.chapter_list_max_entries, 64);
    }

    #[test]
    fn load_partial_toml_keeps_defaults() {
        let file = write_config(
            r#"
[cache]
refresh_cooldown_secs = 60

[preload]
window = 5
"#,
        );
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.cache.refresh_cooldown_secs, 60);
        assert_eq!(config.cache.content_memory_entries, 256);
        assert_eq!(config.preload.window, 5);
        assert!(config.preload.enabled);
    }

    #[test]
    fn load_invalid_toml_is_config_parse_error() {
        let file = write_config("this is not valid toml {{{{");
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, NovelError::ConfigParse { .. }));
        assert_eq!(err.error_code(), "NVC-C001");
    }

    #[test]
    fn roundtrip_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.network.timeout_seconds = 120;
        config.preload.concurrency = 2;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.network.timeout_seconds, 120);
        assert_eq!(loaded.preload.concurrency, 2);
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let cases: [fn(&mut Config); 5] = [
            |c| c.network.timeout_seconds = 0,
            |c| c.network.timeout_seconds = 301,
            |c| c.cache.chapter_list_max_entries = 0,
            |c| c.preload.concurrency = 9,
            |c| c.preload.window = 51,
        ];
        for mutate in cases {
            let mut config = Config::default();
            mutate(&mut config);
            assert!(config.validate().is_err(), "{config:?} should be invalid");
        }
    }

    #[test]
    fn validate_boundary_values() {
        let mut config = Config::default();
        config.network.timeout_seconds = 300;
        config.preload.concurrency = 8;
        config.preload.window = 50;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn settings_from_defaults() {
        let settings = CacheSettings::in_dir("/tmp/content");
        assert_eq!(settings.content_dir, PathBuf::from("/tmp/content"));
        assert_eq!(settings.refresh_cooldown, Duration::from_secs(600));
        assert_eq!(settings.preload.delay, Duration::from_millis(300));
        assert!(settings.user_agent.starts_with("novelcache/"));
    }

    #[test]
    fn resolve_uses_config_file() {
        let _guard = clean_env();
        let file = write_config(
            r#"
[general]
cache_dir = "/tmp/novelcache-test"
log_level = "info"

[network]
timeout_seconds = 45
"#,
        );
        let resolved = ResolvedConfig::resolve(&make_test_cli(file.path())).unwrap();
        assert_eq!(
            resolved.settings.content_dir,
            PathBuf::from("/tmp/novelcache-test/content")
        );
        assert_eq!(resolved.settings.fetch_timeout, Duration::from_secs(45));
        assert_eq!(resolved.log_level.as_deref(), Some("info"));
        assert_eq!(resolved.sources.cache_dir, ConfigSource::ConfigFile);
    }

    #[test]
    fn env_overrides_config_file() {
        let _guard = clean_env();
        let file = write_config("[network]\ntimeout_seconds = 45\n");
        set_env(ENV_TIMEOUT, "10");
        set_env(ENV_CACHE_DIR, "/tmp/from-env");
        set_env(ENV_PRELOAD_WINDOW, "7");
        set_env(ENV_NO_PRELOAD, "yes");

        let resolved = ResolvedConfig::resolve(&make_test_cli(file.path())).unwrap();
        for key in ALL_ENV {
            remove_env(key);
        }

        assert_eq!(resolved.settings.fetch_timeout, Duration::from_secs(10));
        assert_eq!(resolved.sources.timeout, ConfigSource::Env);
        assert_eq!(resolved.paths.cache, PathBuf::from("/tmp/from-env"));
        assert_eq!(resolved.settings.preload.window, 7);
        assert!(!resolved.settings.preload.enabled);
    }

    #[test]
    fn cli_overrides_env() {
        let _guard = clean_env();
        let file = write_config("");
        set_env(ENV_TIMEOUT, "10");
        set_env(ENV_CACHE_DIR, "/tmp/from-env");

        let mut cli = make_test_cli(file.path());
        cli.timeout = Some(20);
        cli.cache_dir = Some(PathBuf::from("/tmp/from-cli"));
        let resolved = ResolvedConfig::resolve(&cli).unwrap();
        for key in ALL_ENV {
            remove_env(key);
        }

        assert_eq!(resolved.settings.fetch_timeout, Duration::from_secs(20));
        assert_eq!(resolved.sources.timeout, ConfigSource::Cli);
        assert_eq!(resolved.paths.cache, PathBuf::from("/tmp/from-cli"));
        assert_eq!(resolved.sources.cache_dir, ConfigSource::Cli);
    }

    #[test]
    fn malformed_env_value_is_ignored() {
        let _guard = clean_env();
        let file = write_config("");
        set_env(ENV_TIMEOUT, "soon");
        let resolved = ResolvedConfig::resolve(&make_test_cli(file.path())).unwrap();
        remove_env(ENV_TIMEOUT);
        assert_eq!(resolved.settings.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn out_of_range_cli_timeout_is_rejected() {
        let _guard = clean_env();
        let file = write_config("");
        let mut cli = make_test_cli(file.path());
        cli.timeout = Some(0);
        assert!(ResolvedConfig::resolve(&cli).is_err());
    }

    #[test]
    fn config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI flag");
        assert_eq!(ConfigSource::Env.to_string(), "environment variable");
        assert_eq!(ConfigSource::ConfigFile.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }
}
