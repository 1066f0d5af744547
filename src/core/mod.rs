//! Cache engine core: models, source boundary, and fetch policy.

pub mod dedup;
pub mod engine;
pub mod http;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod preload;
pub mod source;
pub mod throttle;

pub use dedup::RequestDeduplicator;
pub use engine::{Engine, EngineStats};
pub use models::{Book, BookId, Chapter, ChapterId, ChapterList, Direction, ReadingPosition};
pub use orchestrator::FetchOrchestrator;
pub use preload::Preloader;
pub use source::{HttpJsonSource, SourceFetcher, SourceRegistry};
pub use throttle::FetchThrottle;
