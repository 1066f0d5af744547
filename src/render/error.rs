//! Error rendering.
//!
//! Human mode prints one `Error [code]: message` line. JSON mode prints a
//! structured object so scripts can branch on the code.

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::NovelError;

/// Render an error for stderr in the requested format.
#[must_use]
pub fn render_error(error: &NovelError, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => render_error_json(error),
        OutputFormat::Human => render_simple(error),
    }
}

/// Render error as structured JSON for machine consumption.
#[must_use]
pub fn render_error_json(error: &NovelError) -> String {
    serde_json::to_string_pretty(&ErrorJson::from_error(error))
        .unwrap_or_else(|_| render_simple(error))
}

fn render_simple(error: &NovelError) -> String {
    let mut out = format!("Error [{}]: {}", error.error_code(), error);
    if let Some(hint) = hint(error) {
        out.push_str("\nHint: ");
        out.push_str(hint);
    }
    out
}

fn hint(error: &NovelError) -> Option<&'static str> {
    match error {
        NovelError::ConfigParse { .. } | NovelError::Config(_) => {
            Some("check the config file or pass --config with a valid path")
        }
        NovelError::CacheIo { .. } => Some("check permissions on the cache directory (novelcache cache-dir)"),
        NovelError::InvalidUrl { .. } => Some("pass the absolute http(s) URL of the book's chapter index"),
        err if err.is_retryable() => Some("the source may be temporarily unavailable, try again later"),
        _ => None,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorJson {
    error_code: String,
    category: String,
    message: String,
    is_retryable: bool,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl ErrorJson {
    fn from_error(error: &NovelError) -> Self {
        Self {
            error_code: error.error_code().to_string(),
            category: error.category().to_string(),
            message: error.to_string(),
            is_retryable: error.is_retryable(),
            exit_code: error.exit_code().into(),
            hint: hint(error).map(String::from),
        }
    }
}
