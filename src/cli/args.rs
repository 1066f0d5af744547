//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use reqwest::Url;

use crate::core::models::{Book, BookId, ChapterId};
use crate::error::{NovelError, Result};
use crate::storage::config::MAX_PRELOAD_WINDOW;

/// Novel chapter cache - fetch, cache and preload web-novel chapters.
#[derive(Parser, Debug)]
#[command(name = "novelcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Cache directory (overrides config and NOVELCACHE_CACHE_DIR)
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Network timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a book's chapter list
    Chapters(ChaptersArgs),

    /// Print a chapter's text
    Read(ReadArgs),

    /// Warm the cache for the chapters after the given one
    Preload(PreloadArgs),

    /// Clear cached content for one book or all books
    Clear(ClearArgs),

    /// Print the cache directory path
    CacheDir,
}

/// Identifies a book on the command line.
#[derive(Args, Debug, Clone)]
pub struct BookArgs {
    /// URL of the book's chapter index
    #[arg(value_name = "SOURCE_URL")]
    pub source_url: String,

    /// Explicit book id (defaults to a hash of the source URL)
    #[arg(long, value_name = "ID")]
    pub book_id: Option<String>,
}

impl BookArgs {
    /// Build the book these arguments refer to.
    ///
    /// # Errors
    ///
    /// Returns [`NovelError::InvalidUrl`] unless the source URL is absolute
    /// `http` or `https`.
    pub fn book(&self) -> Result<Book> {
        let url = Url::parse(&self.source_url).map_err(|e| NovelError::InvalidUrl {
            url: self.source_url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NovelError::InvalidUrl {
                url: self.source_url.clone(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(match &self.book_id {
            Some(id) => Book::new(BookId::new(id), self.source_url.clone()),
            None => Book::from_source_url(self.source_url.clone()),
        })
    }
}

/// Arguments for the `chapters` command.
#[derive(Parser, Debug)]
pub struct ChaptersArgs {
    #[command(flatten)]
    pub book: BookArgs,

    /// Wait for a network refresh instead of serving the cached list
    #[arg(long)]
    pub refresh: bool,
}

/// Arguments for the `read` command.
#[derive(Parser, Debug)]
pub struct ReadArgs {
    #[command(flatten)]
    pub book: BookArgs,

    /// Chapter URL (as listed by `chapters`)
    #[arg(value_name = "CHAPTER_URL")]
    pub chapter_url: String,

    /// Do not preload the following chapters
    #[arg(long)]
    pub no_preload: bool,
}

impl ReadArgs {
    #[must_use]
    pub fn chapter_id(&self) -> ChapterId {
        ChapterId::new(&self.chapter_url)
    }
}

/// Arguments for the `preload` command.
#[derive(Parser, Debug)]
pub struct PreloadArgs {
    #[command(flatten)]
    pub book: BookArgs,

    /// Chapter to preload after
    #[arg(value_name = "CHAPTER_URL")]
    pub chapter_url: String,

    /// Number of chapters to preload (defaults to the configured window, at most 50)
    #[arg(long, value_name = "N", value_parser = parse_preload_count)]
    pub count: Option<usize>,
}

impl PreloadArgs {
    #[must_use]
    pub fn chapter_id(&self) -> ChapterId {
        ChapterId::new(&self.chapter_url)
    }
}

fn parse_preload_count(raw: &str) -> std::result::Result<usize, String> {
    let count: usize = raw.parse().map_err(|e| format!("{e}"))?;
    if count > MAX_PRELOAD_WINDOW {
        return Err(format!("must be at most {MAX_PRELOAD_WINDOW}"));
    }
    Ok(count)
}

/// Arguments for the `clear` command.
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Only clear this book (all books when omitted)
    #[arg(long, value_name = "ID")]
    pub book_id: Option<String>,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
}
