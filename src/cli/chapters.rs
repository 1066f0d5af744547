//! `chapters` command implementation.

use crate::cli::args::{ChaptersArgs, OutputFormat};
use crate::core::engine::Engine;
use crate::error::Result;
use crate::render::{self, ChapterListView};

/// Execute the chapters command.
pub async fn execute(engine: &Engine, args: &ChaptersArgs, format: OutputFormat) -> Result<()> {
    let book = args.book.book()?;
    tracing::debug!(book_id = %book.id, refresh = args.refresh, "Listing chapters");

    let chapters = if args.refresh {
        engine.refresh_chapter_list(&book).await?
    } else {
        engine.get_chapter_list(&book).await
    };

    let view = ChapterListView {
        book_id: book.id.clone(),
        source_url: book.source_url.clone(),
        chapters,
    };
    println!("{}", render::render_chapters(&view, format)?);
    Ok(())
}
