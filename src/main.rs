//! novelcache - web-novel chapter cache
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use novelcache::cli::{self, Cli, Commands};
use novelcache::core::logging;
use novelcache::error::NovelError;
use novelcache::storage::config::ResolvedConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = cli.format;

    // Config errors are reported before logging is up, so resolve first and
    // let the file's log level take part in logging setup.
    let resolved = ResolvedConfig::resolve(&cli);
    let file_level = resolved.as_ref().ok().and_then(|r| r.log_level.clone());
    init_logging(&cli, file_level.as_deref());

    let result = match resolved {
        Ok(resolved) => run(cli, resolved).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error_code = e.error_code(), "Command failed: {e}");
            eprintln!("{}", novelcache::render::error::render_error(&e, format));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn init_logging(cli: &Cli, file_level: Option<&str>) {
    let settings = logging::LogSettings::resolve(
        cli.log_level.as_deref(),
        file_level,
        cli.json_output,
        cli.verbose,
    );
    logging::init(&settings);
}

async fn run(cli: Cli, resolved: ResolvedConfig) -> Result<(), NovelError> {
    let format = cli.format;
    tracing::debug!(
        cache_dir = %resolved.settings.content_dir.display(),
        cache_dir_source = %resolved.sources.cache_dir,
        timeout_source = %resolved.sources.timeout,
        "Configuration resolved"
    );

    let Some(command) = cli.command else {
        print_quickstart();
        return Ok(());
    };

    if matches!(command, Commands::CacheDir) {
        return cli::clear::execute_cache_dir(&resolved.settings.content_dir, format);
    }

    let mut settings = resolved.settings;
    if let Commands::Read(args) = &command
        && args.no_preload
    {
        settings.preload.enabled = false;
    }
    let engine = cli::build_engine(settings, &resolved.paths)?;

    let result = match &command {
        Commands::Chapters(args) => cli::chapters::execute(&engine, args, format).await,
        Commands::Read(args) => cli::read::execute(&engine, args, format).await,
        Commands::Preload(args) => cli::read::execute_preload(&engine, args, format).await,
        Commands::Clear(args) => cli::clear::execute(&engine, args, format),
        Commands::CacheDir => Ok(()),
    };

    // Let queued preloads and background refreshes land in the cache.
    engine.shutdown().await;
    result
}

/// Print quickstart help when no command is given.
fn print_quickstart() {
    println!(
        r"novelcache - web-novel chapter cache

Fetches chapter lists and chapter text, caches them on disk and preloads
the chapters you are about to read.

USAGE:
    novelcache [OPTIONS] <COMMAND>

COMMANDS:
    chapters    Show a book's chapter list
    read        Print a chapter's text
    preload     Warm the cache for upcoming chapters
    clear       Clear cached content
    cache-dir   Print the cache directory path

QUICK START:
    novelcache chapters https://novels.example/book/1.json
    novelcache read https://novels.example/book/1.json https://novels.example/book/1/c/1
    novelcache chapters https://novels.example/book/1.json --refresh --format json

For more help: novelcache --help
"
    );
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
}
