//! Core data models shared by every cache tier.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// =============================================================================
// Identifiers
// =============================================================================

/// Stable unique identifier of a book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(Arc<str>);

impl BookId {
    /// Create a book id from any string.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Derive a stable id from a source URL.
    ///
    /// Used when the host does not supply its own id.
    #[must_use]
    pub fn from_source_url(url: &str) -> Self {
        Self::new(short_hash(url.trim()))
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a chapter within a book (the chapter URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterId(Arc<str>);

impl ChapterId {
    /// Create a chapter id from any string.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChapterId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// First 16 bytes of a SHA-256 digest, hex encoded (32 characters).
///
/// Used for book ids and on-disk file names; collisions are not a concern at
/// the scale of one reader's library.
#[must_use]
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..16])
}

// =============================================================================
// Book
// =============================================================================

/// Where the reader left off in a book.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPosition {
    /// Last chapter the reader opened.
    pub chapter_id: Option<ChapterId>,
    /// Character offset within that chapter.
    pub position: u64,
    /// Display page within that chapter.
    pub page: u32,
}

/// A book as seen by the cache engine.
///
/// The book-metadata subsystem owns everything else about a book; this is only
/// the part the cache engine needs to route fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub last_read: ReadingPosition,
}

impl Book {
    /// Create a book with an explicit id.
    #[must_use]
    pub fn new(id: impl Into<BookId>, source_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            title: None,
            last_read: ReadingPosition::default(),
        }
    }

    /// Create a book whose id is derived from its source URL.
    #[must_use]
    pub fn from_source_url(source_url: impl Into<String>) -> Self {
        let source_url = source_url.into();
        Self::new(BookId::from_source_url(&source_url), source_url)
    }

    /// Builder: sets the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

// =============================================================================
// Chapter
// =============================================================================

/// One entry of a book's chapter index. The URL doubles as the chapter id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub url: String,
}

impl Chapter {
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// The chapter's identifier within its book.
    #[must_use]
    pub fn id(&self) -> ChapterId {
        ChapterId::new(&self.url)
    }
}

/// Shared, immutable, ordered chapter index of one book.
pub type ChapterList = Arc<[Chapter]>;

/// Navigation direction within a chapter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Position of a chapter within an ordered list.
#[must_use]
pub fn position_of(chapters: &[Chapter], chapter_id: &ChapterId) -> Option<usize> {
    chapters.iter().position(|c| c.url == chapter_id.as_str())
}

/// The chapter adjacent to `chapter_id` in the given direction.
#[must_use]
pub fn adjacent<'a>(
    chapters: &'a [Chapter],
    chapter_id: &ChapterId,
    direction: Direction,
) -> Option<&'a Chapter> {
    let index = position_of(chapters, chapter_id)?;
    match direction {
        Direction::Next => chapters.get(index + 1),
        Direction::Previous => index.checked_sub(1).and_then(|i| chapters.get(i)),
    }
}
