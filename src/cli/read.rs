//! `read` and `preload` command implementations.

use crate::cli::args::{OutputFormat, PreloadArgs, ReadArgs};
use crate::core::engine::Engine;
use crate::error::Result;
use crate::render::{self, ChapterTextView, PreloadView};

/// Execute the read command.
///
/// Preloading of the following chapters is queued by the engine; the caller
/// waits for it when shutting the engine down.
pub async fn execute(engine: &Engine, args: &ReadArgs, format: OutputFormat) -> Result<()> {
    let book = args.book.book()?;
    let chapter_id = args.chapter_id();

    let text = engine.get_chapter_content(&book, &chapter_id).await?;
    let view = ChapterTextView {
        book_id: book.id,
        chapter_id,
        text,
    };
    println!("{}", render::render_text(&view, format)?);
    Ok(())
}

/// Execute the preload command and wait for the queued chapters.
pub async fn execute_preload(engine: &Engine, args: &PreloadArgs, format: OutputFormat) -> Result<()> {
    let book = args.book.book()?;
    let chapter_id = args.chapter_id();

    let queued = engine.preload_from(&book, &chapter_id, args.count).await;
    engine.shutdown().await;

    let view = PreloadView {
        book_id: book.id,
        after: chapter_id,
        queued,
        stats: engine.stats(),
    };
    println!("{}", render::render_preload(&view, format)?);
    Ok(())
}
