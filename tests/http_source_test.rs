//! HTTP JSON source against a local mock server, alone and behind the engine.

use std::sync::Arc;
use std::time::Duration;

use novelcache::core::engine::Engine;
use novelcache::core::models::{Book, ChapterId};
use novelcache::core::source::{HttpJsonSource, SourceFetcher, SourceRegistry};
use novelcache::error::FetchError;
use novelcache::storage::snapshot::{JsonSnapshotStore, SnapshotStore};
use novelcache::test_utils::TestDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

use common::fixtures::{chapter_index, titles};

fn source() -> HttpJsonSource {
    HttpJsonSource::new(Duration::from_secs(5), "novelcache-test").unwrap()
}

fn book(server: &MockServer) -> Book {
    Book::new("B1", format!("{}/book/1/index.json", server.uri()))
}

#[tokio::test]
async fn chapter_index_urls_are_made_absolute() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/1/index.json"))
        .and(header("user-agent", "novelcache-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chapter_index(&[
            ("Prologue", "c/1"),
            ("Chapter 2", "/elsewhere/2"),
            ("Chapter 3", "https://mirror.example/3"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let chapters = source().fetch_chapter_list(&book(&server)).await.unwrap();

    assert_eq!(titles(&chapters), ["Prologue", "Chapter 2", "Chapter 3"]);
    assert_eq!(chapters[0].url, format!("{}/book/1/c/1", server.uri()));
    assert_eq!(chapters[1].url, format!("{}/elsewhere/2", server.uri()));
    assert_eq!(chapters[2].url, "https://mirror.example/3");
}

#[tokio::test]
async fn chapter_text_is_the_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/1/c/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("It was a dark night."))
        .mount(&server)
        .await;

    let chapter = ChapterId::new(format!("{}/book/1/c/1", server.uri()));
    let text = source()
        .fetch_chapter_content(&book(&server), &chapter)
        .await
        .unwrap();

    assert_eq!(text, "It was a dark night.");
}

#[tokio::test]
async fn error_status_maps_to_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = source().fetch_chapter_list(&book(&server)).await.unwrap_err();

    assert!(matches!(err, FetchError::Http { status: 404, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn malformed_index_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = source().fetch_chapter_list(&book(&server)).await.unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let slow = HttpJsonSource::new(Duration::from_millis(200), "novelcache-test").unwrap();
    let err = slow.fetch_chapter_list(&book(&server)).await.unwrap_err();

    assert!(matches!(err, FetchError::Timeout { .. }));
}

#[tokio::test]
async fn engine_over_http_caches_both_tiers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/1/index.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chapter_index(&[("C1", "c/1"), ("C2", "c/2")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/book/1/c/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("one"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/book/1/c/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("two"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TestDir::new();
    let fetcher: Arc<dyn SourceFetcher> = Arc::new(source());
    let snapshots = Arc::new(JsonSnapshotStore::new(dir.path().join("books")));
    let store: Arc<dyn SnapshotStore> = snapshots.clone();
    let engine = Engine::new(dir.settings(), SourceRegistry::single(fetcher), store);
    let book = book(&server);

    let chapters = engine.get_chapter_list(&book).await;
    assert_eq!(chapters.len(), 2);
    let first = chapters[0].id();

    // Reading chapter 1 preloads chapter 2; reading both again stays local.
    assert_eq!(engine.get_chapter_content(&book, &first).await.unwrap(), "one");
    engine.shutdown().await;
    assert_eq!(engine.get_chapter_content(&book, &first).await.unwrap(), "one");
    assert_eq!(engine.get_chapter_content(&book, &chapters[1].id()).await.unwrap(), "two");
    assert_eq!(engine.get_chapter_list(&book).await, chapters);

    assert!(snapshots.snapshot_path(&book.id).is_file());
    assert_eq!(snapshots.load(&book.id).unwrap(), Some(chapters));
}
