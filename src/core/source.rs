//! Source Fetcher boundary.
//!
//! A [`SourceFetcher`] knows how to pull a book's chapter index and chapter
//! text from one kind of remote site. The cache engine never talks to the
//! network any other way. [`SourceRegistry`] routes a book to its fetcher by
//! the host of the book's source URL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::core::http;
use crate::core::models::{Book, Chapter, ChapterId};
use crate::error::FetchError;

/// Result of a single source call.
pub type FetchResult<T> = Result<T, FetchError>;

/// Per-site fetch logic.
///
/// Implementations should not retry or cache; the orchestrator owns both.
pub trait SourceFetcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetch the book's full, ordered chapter index.
    fn fetch_chapter_list<'a>(&'a self, book: &'a Book) -> BoxFuture<'a, FetchResult<Vec<Chapter>>>;

    /// Fetch the text of one chapter.
    fn fetch_chapter_content<'a>(
        &'a self,
        book: &'a Book,
        chapter_id: &'a ChapterId,
    ) -> BoxFuture<'a, FetchResult<String>>;
}

impl std::fmt::Debug for dyn SourceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFetcher").field("name", &self.name()).finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Routes books to fetchers by source host.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    by_host: HashMap<String, Arc<dyn SourceFetcher>>,
    fallback: Option<Arc<dyn SourceFetcher>>,
}

impl SourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that sends every book to one fetcher.
    #[must_use]
    pub fn single(fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self::new().with_default(fetcher)
    }

    /// Builder: fetcher used when no host matches.
    #[must_use]
    pub fn with_default(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fallback = Some(fetcher);
        self
    }

    /// Builder: route a host (case-insensitive, `www.` ignored) to a fetcher.
    #[must_use]
    pub fn with_host(mut self, host: &str, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.by_host.insert(normalize_host(host), fetcher);
        self
    }

    /// Find the fetcher for a book.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::SourceUnavailable`] when neither a host route nor
    /// a default fetcher applies.
    pub fn resolve(&self, book: &Book) -> FetchResult<Arc<dyn SourceFetcher>> {
        let host = Url::parse(&book.source_url)
            .ok()
            .and_then(|url| url.host_str().map(normalize_host));

        host.as_ref()
            .and_then(|h| self.by_host.get(h))
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| {
                FetchError::SourceUnavailable(host.unwrap_or_else(|| book.source_url.clone()))
            })
    }

    /// Number of host routes (the default fetcher is not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_host.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_host.is_empty() && self.fallback.is_none()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut hosts: Vec<_> = self.by_host.keys().collect();
        hosts.sort();
        f.debug_struct("SourceRegistry")
            .field("hosts", &hosts)
            .field("default", &self.fallback.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

// =============================================================================
// JSON-over-HTTP source
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChapterIndex {
    chapters: Vec<Chapter>,
}

/// Fetcher for sites exposing a JSON chapter index and plain-text chapters.
///
/// - `GET <source_url>` returns `{"chapters": [{"title": .., "url": ..}]}`
/// - `GET <chapter_url>` returns the chapter body as text
///
/// Relative chapter URLs are resolved against the source URL, so chapter ids
/// are always absolute.
#[derive(Debug, Clone)]
pub struct HttpJsonSource {
    client: Client,
    timeout: Duration,
}

impl HttpJsonSource {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, user_agent: &str) -> FetchResult<Self> {
        Ok(Self {
            client: http::build_client(timeout, user_agent)?,
            timeout,
        })
    }

    async fn chapter_list(&self, book: &Book) -> FetchResult<Vec<Chapter>> {
        let index: ChapterIndex = http::fetch_json(&self.client, &book.source_url, self.timeout).await?;
        index
            .chapters
            .into_iter()
            .map(|chapter| {
                let url = resolve_url(&book.source_url, &chapter.url)?;
                Ok(Chapter::new(chapter.title, url))
            })
            .collect()
    }

    async fn chapter_content(&self, book: &Book, chapter_id: &ChapterId) -> FetchResult<String> {
        let url = resolve_url(&book.source_url, chapter_id.as_str())?;
        http::fetch_text(&self.client, &url, self.timeout).await
    }
}

impl SourceFetcher for HttpJsonSource {
    fn name(&self) -> &str {
        "http-json"
    }

    fn fetch_chapter_list<'a>(&'a self, book: &'a Book) -> BoxFuture<'a, FetchResult<Vec<Chapter>>> {
        Box::pin(self.chapter_list(book))
    }

    fn fetch_chapter_content<'a>(
        &'a self,
        book: &'a Book,
        chapter_id: &'a ChapterId,
    ) -> BoxFuture<'a, FetchResult<String>> {
        Box::pin(self.chapter_content(book, chapter_id))
    }
}

/// Resolve `target` against `base` (absolute targets pass through).
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if either URL is malformed.
pub fn resolve_url(base: &str, target: &str) -> FetchResult<String> {
    Url::parse(base)
        .and_then(|base| base.join(target))
        .map(String::from)
        .map_err(|e| FetchError::Parse(format!("invalid URL '{target}' (base '{base}'): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockSource;

    #[test]
    fn resolve_url_handles_relative_and_absolute() {
        assert_eq!(
            resolve_url("https://example.org/book/1/index.json", "c/2").unwrap(),
            "https://example.org/book/1/c/2"
        );
        assert_eq!(
            resolve_url("https://example.org/book/1/", "/c/2").unwrap(),
            "https://example.org/c/2"
        );
        assert_eq!(
            resolve_url("https://example.org/book/1", "https://mirror.net/c/2").unwrap(),
            "https://mirror.net/c/2"
        );
        assert!(matches!(
            resolve_url("not a url", "c/2"),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn registry_routes_by_host() {
        let alpha: Arc<dyn SourceFetcher> = Arc::new(MockSource::named("alpha"));
        let beta: Arc<dyn SourceFetcher> = Arc::new(MockSource::named("beta"));
        let registry = SourceRegistry::new()
            .with_host("alpha.example", alpha)
            .with_host("WWW.Beta.Example", beta);

        let book = Book::from_source_url("https://alpha.example/b/1");
        assert_eq!(registry.resolve(&book).unwrap().name(), "alpha");

        let book = Book::from_source_url("https://www.beta.example/b/1");
        assert_eq!(registry.resolve(&book).unwrap().name(), "beta");
    }

    #[test]
    fn registry_falls_back_to_default() {
        let registry = SourceRegistry::new()
            .with_host("alpha.example", Arc::new(MockSource::named("alpha")))
            .with_default(Arc::new(MockSource::named("any")));
        let book = Book::from_source_url("https://unknown.example/b/1");
        assert_eq!(registry.resolve(&book).unwrap().name(), "any");
    }

    #[test]
    fn registry_without_match_is_source_unavailable() {
        let registry =
            SourceRegistry::new().with_host("alpha.example", Arc::new(MockSource::named("alpha")));
        let book = Book::from_source_url("https://unknown.example/b/1");
        let err = registry.resolve(&book).unwrap_err();
        assert_eq!(err, FetchError::SourceUnavailable("unknown.example".to_string()));

        assert!(SourceRegistry::new().is_empty());
    }
}
