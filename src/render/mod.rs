//! Output rendering for human and robot modes.

pub mod error;
pub mod human;
pub mod robot;

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::core::engine::EngineStats;
use crate::core::models::{BookId, Chapter, ChapterId};
use crate::error::Result;

/// A book's chapter list as shown by `chapters`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterListView {
    pub book_id: BookId,
    pub source_url: String,
    pub chapters: Vec<Chapter>,
}

/// One chapter's text as shown by `read`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterTextView {
    pub book_id: BookId,
    pub chapter_id: ChapterId,
    pub text: String,
}

/// Result of a `preload` run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadView {
    pub book_id: BookId,
    pub after: ChapterId,
    pub queued: usize,
    pub stats: EngineStats,
}

/// Result of a `clear` run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearView {
    /// `None` when every book was cleared.
    pub book_id: Option<BookId>,
    pub cache_dir: PathBuf,
}

/// Output of `cache-dir`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheDirView {
    pub cache_dir: PathBuf,
}

/// Render a chapter list.
pub fn render_chapters(view: &ChapterListView, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_chapters(view)),
        OutputFormat::Json => robot::render_json("chapters", view),
    }
}

/// Render a chapter's text.
pub fn render_text(view: &ChapterTextView, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_text(view)),
        OutputFormat::Json => robot::render_json("read", view),
    }
}

/// Render a preload summary.
pub fn render_preload(view: &PreloadView, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_preload(view)),
        OutputFormat::Json => robot::render_json("preload", view),
    }
}

/// Render a clear summary.
pub fn render_clear(view: &ClearView, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_clear(view)),
        OutputFormat::Json => robot::render_json("clear", view),
    }
}

/// Render the cache directory.
pub fn render_cache_dir(view: &CacheDirView, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(view.cache_dir.display().to_string()),
        OutputFormat::Json => robot::render_json("cache-dir", view),
    }
}
