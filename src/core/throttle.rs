//! Per-book network refresh throttle.
//!
//! Records when a book's chapter list was last checked against the network and
//! answers whether the cool-down window has passed. Independent of the
//! chapter-list cache: a list stays servable after its re-check is due.

use std::time::Duration;

use crate::core::models::BookId;
use crate::storage::bounded::{BoundedMap, Expiry};

/// Default cool-down between two network checks of the same book.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(600);
/// Default number of books tracked.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug)]
pub struct FetchThrottle {
    // The record's presence is the signal; it expires with the cool-down.
    checked: BoundedMap<BookId, ()>,
    cooldown: Duration,
}

impl FetchThrottle {
    #[must_use]
    pub fn new(max_entries: usize, cooldown: Duration) -> Self {
        Self {
            checked: BoundedMap::new(max_entries, Expiry::AfterWrite(cooldown)),
            cooldown,
        }
    }

    /// True if there is no record for the book or the record is older than
    /// the cool-down window.
    pub fn should_check_network(&self, book_id: &BookId) -> bool {
        !self.checked.contains_live(book_id)
    }

    /// Start a new cool-down window for the book.
    pub fn record_checked(&self, book_id: &BookId) {
        self.checked.insert(book_id.clone(), ());
    }

    /// Forget the book so the next read checks the network.
    pub fn forget(&self, book_id: &BookId) {
        self.checked.remove(book_id);
    }

    pub fn clear(&self) {
        self.checked.clear();
    }

    /// Drop records whose cool-down has passed.
    pub fn purge_expired(&self) -> usize {
        self.checked.purge_expired()
    }

    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn len(&self) -> usize {
        self.checked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checked.is_empty()
    }
}

impl Default for FetchThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_COOLDOWN)
    }
}
