//! Logging setup.
//!
//! Cache decisions (hits, stale serves, refreshes, preloads) are emitted as
//! `tracing` events under the `novelcache` target. This module picks where they
//! go and how loud they are:
//!
//! - level: `--log-level`, then `NOVELCACHE_LOG`, then `log_level` in the
//!   config file, then `warn`; `--verbose` raises it to at least `debug`
//! - format: `--json-output` or `NOVELCACHE_LOG_FORMAT=json` for JSONL,
//!   human-readable lines otherwise
//! - destination: the file named by `NOVELCACHE_LOG_FILE` (appended), or stderr
//!
//! `RUST_LOG`, when set, replaces the computed filter entirely. Without it the
//! HTTP client crates are capped at `warn`.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

pub const ENV_LOG_LEVEL: &str = "NOVELCACHE_LOG";
pub const ENV_LOG_FORMAT: &str = "NOVELCACHE_LOG_FORMAT";
pub const ENV_LOG_FILE: &str = "NOVELCACHE_LOG_FILE";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per event.
    Json,
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Human,
            file: None,
        }
    }
}

impl LogSettings {
    /// Resolve from CLI flags, the process environment and the config file's
    /// level. Unparseable values are skipped in favour of the next source.
    #[must_use]
    pub fn resolve(cli_level: Option<&str>, config_level: Option<&str>, json: bool, verbose: bool) -> Self {
        Self::resolve_with(cli_level, config_level, json, verbose, |key| std::env::var(key).ok())
    }

    /// [`LogSettings::resolve`] with an explicit environment lookup.
    #[must_use]
    pub fn resolve_with(
        cli_level: Option<&str>,
        config_level: Option<&str>,
        json: bool,
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut level = cli_level
            .and_then(parse_level)
            .or_else(|| env(ENV_LOG_LEVEL).as_deref().and_then(parse_level))
            .or_else(|| config_level.and_then(parse_level))
            .unwrap_or(Level::WARN);
        // More verbose levels compare greater.
        if verbose && level < Level::DEBUG {
            level = Level::DEBUG;
        }

        let format = if json || env(ENV_LOG_FORMAT).is_some_and(|f| f.eq_ignore_ascii_case("json")) {
            LogFormat::Json
        } else {
            LogFormat::Human
        };

        Self {
            level,
            format,
            file: env(ENV_LOG_FILE).map(PathBuf::from),
        }
    }

    /// Filter directives used when `RUST_LOG` is unset.
    #[must_use]
    pub fn directives(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        format!("novelcache={level},reqwest=warn,hyper=warn,hyper_util=warn")
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
    }
}

/// Parse a level name; `verbose` means debug and `critical` means error.
#[must_use]
pub fn parse_level(raw: &str) -> Option<Level> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" | "verbose" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" | "critical" | "crit" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init(settings: &LogSettings) -> bool {
    let writer = open_writer(settings.file.as_deref());
    let filter = settings.filter();
    let installed = match settings.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(writer)
            .try_init(),
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(false)
            .without_time()
            .try_init(),
    };
    installed.is_ok()
}

/// Append to `path`, falling back to stderr if it cannot be opened.
fn open_writer(path: Option<&Path>) -> BoxMakeWriter {
    let Some(path) = path else {
        return BoxMakeWriter::new(std::io::stderr);
    };
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => BoxMakeWriter::new(Arc::new(file)),
        Err(e) => {
            eprintln!("novelcache: cannot open log file {}: {e}", path.display());
            BoxMakeWriter::new(std::io::stderr)
        }
    }
}
