//! In-memory collaborators for application tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{AppError, ChannelHandle, MediaRef, RawMessage, Result};
use crate::infrastructure::{ChannelSource, Enricher};

/// Channel with a fixed history, newest first.
pub struct StubSource {
    messages: Vec<RawMessage>,
    blobs: HashMap<String, Vec<u8>>,
    fail_on_fetch: Option<usize>,
    fetches: AtomicUsize,
}

impl StubSource {
    pub fn new(mut messages: Vec<RawMessage>) -> Self {
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        Self {
            messages,
            blobs: HashMap::new(),
            fail_on_fetch: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_blob(mut self, media_ref: &str, data: &[u8]) -> Self {
        self.blobs.insert(media_ref.to_string(), data.to_vec());
        self
    }

    /// Make the `n`-th fetch (1-based) fail with a transport error.
    pub const fn failing_on_fetch(mut self, n: usize) -> Self {
        self.fail_on_fetch = Some(n);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelSource for StubSource {
    async fn authenticate(&self) -> Result<bool> {
        Ok(true)
    }

    async fn resolve_channel(&self, identifier: &str) -> Result<Option<ChannelHandle>> {
        Ok(Some(ChannelHandle {
            id: 1,
            title: identifier.to_string(),
        }))
    }

    async fn fetch_page(
        &self,
        _handle: &ChannelHandle,
        before: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<RawMessage>> {
        let call = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_fetch == Some(call) {
            return Err(AppError::Transport {
                message: format!("connection reset on fetch {call}"),
                source: None,
            });
        }

        Ok(self
            .messages
            .iter()
            .filter(|m| before.is_none_or(|b| m.id < b))
            .take(page_size)
            .cloned()
            .collect())
    }

    async fn download_blob(&self, media: &MediaRef) -> Result<Vec<u8>> {
        self.blobs.get(&media.0).cloned().ok_or_else(|| AppError::Transport {
            message: format!("blob {media} not found"),
            source: None,
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Enricher that titles every post and fails on bodies containing "boom".
pub struct StubEnricher;

#[async_trait]
impl Enricher for StubEnricher {
    fn provider(&self) -> &str {
        "stub"
    }

    async fn generate_title(&self, text: &str) -> Result<String> {
        if text.contains("boom") {
            return Err(AppError::Transport {
                message: "model unavailable".into(),
                source: None,
            });
        }
        Ok(format!("About {}", text.split_whitespace().next().unwrap_or("nothing")))
    }

    async fn extract_hashtags(&self, _text: &str, max_count: usize) -> Result<Vec<String>> {
        Ok(["news", "rust", "weekly"]
            .iter()
            .take(max_count)
            .map(ToString::to_string)
            .collect())
    }
}

pub fn channel() -> ChannelHandle {
    ChannelHandle {
        id: 1,
        title: "Test Channel".into(),
    }
}

/// Base time for generated histories.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// `count` text messages with ids `1..=count`, one hour apart.
pub fn history(count: i64) -> Vec<RawMessage> {
    (1..=count)
        .map(|id| RawMessage::text(id, epoch() + Duration::hours(id), format!("post number {id}")))
        .collect()
}
