//! Cursor bookkeeping for newest-first history paging.

use chrono::{DateTime, Utc};

use crate::domain::RawMessage;

/// Tracks the exclusive upper bound for the next page and how many pages
/// have been requested so far.
#[derive(Debug, Clone)]
pub struct PageCursor {
    before: Option<i64>,
    pages_fetched: usize,
    max_pages: usize,
}

impl PageCursor {
    /// Cursor positioned at the most recent message.
    #[must_use]
    pub const fn new(max_pages: usize) -> Self {
        Self {
            before: None,
            pages_fetched: 0,
            max_pages,
        }
    }

    /// Upper bound (exclusive) for the next fetch.
    #[must_use]
    pub const fn before(&self) -> Option<i64> {
        self.before
    }

    #[must_use]
    pub const fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Whether the page cap still allows another fetch.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.pages_fetched < self.max_pages
    }

    pub fn page_fetched(&mut self) {
        self.pages_fetched += 1;
    }

    /// Move past `message_id`. Skipped messages advance the cursor too.
    pub fn advance(&mut self, message_id: i64) {
        self.before = Some(message_id);
    }
}

/// Result of scanning one page against a cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffScan {
    /// Number of leading messages strictly newer than the cutoff.
    pub new_count: usize,
    /// Whether a message at or before the cutoff was seen.
    pub reached: bool,
}

/// Find where a newest-first page crosses `cutoff`.
///
/// The first message with `date <= cutoff` ends the scan. Anything after it
/// is never looked at, even if it is newer. Comparison is on raw unix
/// seconds, so a timestamp too large to represent counts as new and is left
/// for the converter to reject.
#[must_use]
pub fn scan_until_cutoff(page: &[RawMessage], cutoff: DateTime<Utc>) -> CutoffScan {
    let cutoff = cutoff.timestamp();
    let mut previous: Option<i64> = None;

    for (idx, message) in page.iter().enumerate() {
        if message.timestamp <= cutoff {
            return CutoffScan {
                new_count: idx,
                reached: true,
            };
        }

        if let Some(prev) = previous {
            if message.timestamp > prev {
                tracing::debug!(
                    message_id = message.id,
                    timestamp = message.timestamp,
                    "Message is newer than the one before it in a newest-first page"
                );
            }
        }
        previous = Some(message.timestamp);
    }

    CutoffScan {
        new_count: page.len(),
        reached: false,
    }
}
