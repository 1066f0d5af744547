//! Plain-text output.

use std::fmt::Write;

use super::{ChapterListView, ChapterTextView, ClearView, PreloadView};

/// Numbered chapter list with a one-line header.
#[must_use]
pub fn render_chapters(view: &ChapterListView) -> String {
    let mut out = String::new();
    if view.chapters.is_empty() {
        let _ = write!(out, "No chapters known for book {} ({})", view.book_id, view.source_url);
        return out;
    }

    let _ = writeln!(
        out,
        "Book {} - {} chapter{}",
        view.book_id,
        view.chapters.len(),
        if view.chapters.len() == 1 { "" } else { "s" }
    );
    let width = view.chapters.len().to_string().len();
    for (i, chapter) in view.chapters.iter().enumerate() {
        let _ = writeln!(out, "{:>width$}. {}  {}", i + 1, chapter.title, chapter.url);
    }
    out.truncate(out.trim_end().len());
    out
}

/// The chapter text itself, unchanged.
#[must_use]
pub fn render_text(view: &ChapterTextView) -> String {
    view.text.clone()
}

#[must_use]
pub fn render_preload(view: &PreloadView) -> String {
    match view.queued {
        0 => format!("Nothing to preload after {} (already cached or end of list)", view.after),
        1 => format!("Preloaded 1 chapter after {}", view.after),
        n => format!("Preloaded {n} chapters after {}", view.after),
    }
}

#[must_use]
pub fn render_clear(view: &ClearView) -> String {
    match &view.book_id {
        Some(id) => format!("Cleared cache for book {id}"),
        None => format!("Cleared all cached content in {}", view.cache_dir.display()),
    }
}
