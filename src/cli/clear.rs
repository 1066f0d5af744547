//! `clear` and `cache-dir` command implementations.

use std::path::Path;

use crate::cli::args::{ClearArgs, OutputFormat};
use crate::core::engine::Engine;
use crate::core::models::BookId;
use crate::error::Result;
use crate::render::{self, CacheDirView, ClearView};

/// Execute the clear command.
pub fn execute(engine: &Engine, args: &ClearArgs, format: OutputFormat) -> Result<()> {
    let book_id = args.book_id.as_deref().map(BookId::new);
    match &book_id {
        Some(id) => engine.clear_book_cache(id)?,
        None => engine.clear_all_cache()?,
    }

    let view = ClearView {
        book_id,
        cache_dir: engine.cache_directory_path().to_path_buf(),
    };
    println!("{}", render::render_clear(&view, format)?);
    Ok(())
}

/// Execute the cache-dir command.
pub fn execute_cache_dir(content_dir: &Path, format: OutputFormat) -> Result<()> {
    let view = CacheDirView {
        cache_dir: content_dir.to_path_buf(),
    };
    println!("{}", render::render_cache_dir(&view, format)?);
    Ok(())
}
