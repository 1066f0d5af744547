//! Error types for novelcache.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are split across two levels:
//! - [`FetchError`]: the Source Fetcher boundary. Cheap to clone, because one
//!   deduplicated network outcome is fanned out to every caller that joined it.
//! - [`NovelError`]: everything the crate can surface to a caller.
//!
//! `NovelError` is categorized into five groups:
//! - **Network**: connection failures, timeouts, HTTP errors
//! - **Source**: no fetcher for a book, unparseable source responses
//! - **Cache**: cache-store and snapshot I/O
//! - **Configuration**: config file parsing or invalid values
//! - **Internal**: unexpected errors, bugs, or unclassified issues
//!
//! Each error has a stable error code (e.g., `NVC-N001`) for programmatic handling.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network issues (timeout, connection failure, HTTP status).
    Network,
    /// Source issues (no fetcher configured, malformed responses).
    Source,
    /// Cache store or snapshot I/O issues.
    Cache,
    /// Configuration issues (parse errors, invalid values).
    Configuration,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network error",
            Self::Source => "Source error",
            Self::Cache => "Cache error",
            Self::Configuration => "Configuration error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Network => "N",
            Self::Source => "S",
            Self::Cache => "K",
            Self::Configuration => "C",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes used by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// No source configured for the requested book
    SourceUnavailable = 2,
    /// Parse/format errors, invalid configuration or input
    ParseError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

// =============================================================================
// Fetch Errors
// =============================================================================

/// Failure reported by a Source Fetcher.
///
/// Every variant is transient from the cache engine's point of view: the
/// orchestrator falls back to cached data before surfacing any of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure (connection refused, reset, DNS).
    #[error("network error: {0}")]
    Network(String),

    /// The fetch did not finish within the configured window.
    #[error("fetch timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The remote answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The remote answered, but the body could not be understood.
    #[error("failed to parse source response: {0}")]
    Parse(String),

    /// No fetcher is configured for the book's source.
    #[error("no source fetcher available for {0}")]
    SourceUnavailable(String),
}

impl FetchError {
    /// Returns whether a later attempt might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout { .. })
            || matches!(self, Self::Http { status, .. } if *status >= 500 || *status == 429)
    }
}

// =============================================================================
// Crate Error
// =============================================================================

/// Main error type for novelcache operations.
///
/// Each variant has:
/// - A stable error code (e.g., `NVC-N001`)
/// - A category for classification
/// - A retryable flag for retry logic
#[derive(Error, Debug)]
pub enum NovelError {
    // ==========================================================================
    // Fetch errors (Category: Network / Source)
    // ==========================================================================
    /// The Source Fetcher failed and no fallback data was available.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    // ==========================================================================
    // Input errors (Category: Source)
    // ==========================================================================
    /// A URL could not be parsed.
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The chapter is not part of the book's chapter list.
    #[error("chapter {chapter} not found in book {book}")]
    ChapterNotInList { book: String, chapter: String },

    // ==========================================================================
    // Cache errors (Category: Cache)
    // ==========================================================================
    /// Reading or writing a cache file failed.
    #[error("cache I/O error at {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // Internal errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NovelError {
    /// Wrap an I/O error with the cache path it happened at.
    #[must_use]
    pub fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheIo {
            path: path.into(),
            source,
        }
    }

    /// Map error to a process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Fetch(FetchError::Timeout { .. }) => ExitCode::Timeout,
            Self::Fetch(FetchError::SourceUnavailable(_)) => ExitCode::SourceUnavailable,

            Self::InvalidUrl { .. }
            | Self::ChapterNotInList { .. }
            | Self::ConfigParse { .. }
            | Self::Config(_)
            | Self::Fetch(FetchError::Parse(_)) => ExitCode::ParseError,

            Self::Fetch(FetchError::Network(_) | FetchError::Http { .. })
            | Self::CacheIo { .. }
            | Self::Io(_)
            | Self::Json(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(FetchError::Network(_) | FetchError::Timeout { .. } | FetchError::Http { .. }) => {
                ErrorCategory::Network
            }
            Self::Fetch(FetchError::Parse(_) | FetchError::SourceUnavailable(_))
            | Self::InvalidUrl { .. }
            | Self::ChapterNotInList { .. } => ErrorCategory::Source,
            Self::CacheIo { .. } => ErrorCategory::Cache,
            Self::ConfigParse { .. } | Self::Config(_) => ErrorCategory::Configuration,
            Self::Io(_) | Self::Json(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `NVC-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            // Network errors (N001-N099)
            Self::Fetch(FetchError::Timeout { .. }) => "NVC-N001",
            Self::Fetch(FetchError::Network(_)) => "NVC-N002",
            Self::Fetch(FetchError::Http { .. }) => "NVC-N003",

            // Source errors (S001-S099)
            Self::Fetch(FetchError::SourceUnavailable(_)) => "NVC-S001",
            Self::Fetch(FetchError::Parse(_)) => "NVC-S002",
            Self::InvalidUrl { .. } => "NVC-S010",
            Self::ChapterNotInList { .. } => "NVC-S011",

            // Cache errors (K001-K099)
            Self::CacheIo { .. } => "NVC-K001",

            // Configuration errors (C001-C099)
            Self::ConfigParse { .. } => "NVC-C001",
            Self::Config(_) => "NVC-C002",

            // Internal errors (X001-X099)
            Self::Io(_) => "NVC-X001",
            Self::Json(_) => "NVC-X002",
        }
    }

    /// Returns whether the error is potentially recoverable by retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(err) => err.is_retryable(),
            Self::CacheIo { .. } => true,
            _ => false,
        }
    }
}

/// Result type alias for novelcache operations.
pub type Result<T> = std::result::Result<T, NovelError>;
