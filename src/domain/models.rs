//! Domain models for archived channel data.
//!
//! `RawMessage` is what a channel source hands us, `Post` is the normalized
//! form built during a run, and `ExportSummary` is the durable aggregate
//! written to `summary.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque reference a channel source uses to locate a media blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef(pub String);

impl std::fmt::Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single attachment on a raw message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Compressed image.
    Photo { media_ref: MediaRef },
    /// Any file sent as a document (video, audio, pdf, ...).
    Document {
        media_ref: MediaRef,
        file_name: Option<String>,
        mime_type: Option<String>,
    },
    /// Polls, locations, stickers and anything else we don't archive.
    Unsupported { kind: String },
}

/// One reaction bucket on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    #[serde(default)]
    pub emoji: String,
    pub count: i64,
}

/// A message exactly as delivered by the channel source.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: i64,
    /// Unix seconds as stored by the source. May be out of chrono's range.
    pub timestamp: i64,
    pub edit_date: Option<DateTime<Utc>>,
    pub text: Option<String>,
    pub views: Option<i64>,
    pub forwards: Option<i64>,
    pub reactions: Vec<Reaction>,
    pub attachments: Vec<Attachment>,
}

impl RawMessage {
    /// Minimal text message, mostly useful for tests and stubs.
    #[must_use]
    pub fn text(id: i64, date: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            id,
            timestamp: date.timestamp(),
            edit_date: None,
            text: Some(text.into()),
            views: None,
            forwards: None,
            reactions: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Creation time, or `None` when the timestamp cannot be represented.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Resolved channel, as returned by a source lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    /// Source-specific numeric id.
    pub id: i64,
    /// Display title.
    pub title: String,
}

/// A normalized channel post built from one raw message.
#[derive(Debug, Clone, Default)]
pub struct Post {
    /// Source-assigned id, unique within the channel.
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub views: u64,
    pub reactions: u64,
    pub total_forwards: u64,
    pub public_forwards: u64,
    pub private_forwards: u64,
    /// Body text, possibly empty.
    pub content: String,
    /// File names under `media/`, in attachment order.
    pub media_files: Vec<String>,
    /// Title produced by the enrichment service.
    pub generated_title: Option<String>,
    pub hashtags: Vec<String>,
    pub is_enriched: bool,
    pub enrichment_provider: String,
}

impl Post {
    /// Build the persisted projection with a preview of at most `preview_chars`.
    #[must_use]
    pub fn summary(&self, preview_chars: usize) -> PostSummary {
        PostSummary {
            post_id: self.id,
            created_at: self.created_at,
            is_edited: self.is_edited,
            edited_at: self.edited_at,
            views: self.views,
            reactions: self.reactions,
            total_forwards: self.total_forwards,
            public_forwards: self.public_forwards,
            private_forwards: self.private_forwards,
            content_preview: content_preview(&self.content, preview_chars),
        }
    }

    /// Whether there is any body text worth rendering or enriching.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Cut `content` to `max_chars` characters, appending `...` when shortened.
#[must_use]
pub fn content_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}

/// Persisted projection of a post. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub reactions: u64,
    #[serde(default)]
    pub total_forwards: u64,
    #[serde(default)]
    pub public_forwards: u64,
    #[serde(default)]
    pub private_forwards: u64,
    #[serde(default)]
    pub content_preview: String,
}

/// Outcome of an enrichment pass over a run's posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentSummary {
    pub total_posts: usize,
    pub processed_posts: usize,
    pub titles_generated: usize,
    pub hashtags_extracted: usize,
    pub failed_posts: usize,
    pub provider: String,
    #[serde(default)]
    pub errors: Vec<String>,
    pub processing_started: DateTime<Utc>,
    pub processing_completed: DateTime<Utc>,
}

impl EnrichmentSummary {
    /// Start an empty summary for `provider`.
    #[must_use]
    pub fn started(provider: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            total_posts: 0,
            processed_posts: 0,
            titles_generated: 0,
            hashtags_extracted: 0,
            failed_posts: 0,
            provider: provider.into(),
            errors: Vec::new(),
            processing_started: now,
            processing_completed: now,
        }
    }

    /// Wall-clock time spent enriching.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.processing_completed - self.processing_started
    }
}

/// Aggregate root persisted as `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub total_posts: usize,
    pub export_time: DateTime<Utc>,
    pub export_path: String,
    #[serde(default)]
    pub summary_file_path: String,
    #[serde(default)]
    pub media_files_count: usize,
    #[serde(default)]
    pub posts: Vec<PostSummary>,
    #[serde(default, alias = "llmSummary")]
    pub enrichment_summary: Option<EnrichmentSummary>,
}

impl ExportSummary {
    /// Empty summary for a fresh export rooted at `export_path`.
    #[must_use]
    pub fn new(export_path: impl Into<String>) -> Self {
        Self {
            total_posts: 0,
            export_time: Utc::now(),
            export_path: export_path.into(),
            summary_file_path: String::new(),
            media_files_count: 0,
            posts: Vec::new(),
            enrichment_summary: None,
        }
    }

    /// Newest creation time already captured; the cutoff for the next update.
    #[must_use]
    pub fn latest_post_time(&self) -> Option<DateTime<Utc>> {
        self.posts.iter().map(|p| p.created_at).max()
    }

    /// Oldest creation time already captured.
    #[must_use]
    pub fn earliest_post_time(&self) -> Option<DateTime<Utc>> {
        self.posts.iter().map(|p| p.created_at).min()
    }
}

/// Lifecycle of an incremental run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Started,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "Started"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Result of one incremental run, consumed once by the summary merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub new_posts_count: usize,
    pub update_time: DateTime<Utc>,
    pub date_range_from: DateTime<Utc>,
    pub date_range_to: DateTime<Utc>,
    pub export_path: String,
    pub media_files_count: usize,
    pub new_posts: Vec<PostSummary>,
    pub status: RunStatus,
    pub error_message: Option<String>,
}

impl UpdateResult {
    /// A run that has just begun looking for posts newer than `cutoff`.
    #[must_use]
    pub fn started(cutoff: DateTime<Utc>, export_path: impl Into<String>) -> Self {
        Self {
            new_posts_count: 0,
            update_time: Utc::now(),
            date_range_from: cutoff,
            date_range_to: cutoff,
            export_path: export_path.into(),
            media_files_count: 0,
            new_posts: Vec::new(),
            status: RunStatus::Started,
            error_message: None,
        }
    }

    /// Mark as completed, deriving the count and date range from `new_posts`.
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.new_posts_count = self.new_posts.len();
        self.date_range_to = self
            .new_posts
            .iter()
            .map(|p| p.created_at)
            .max()
            .unwrap_or(self.date_range_from);
        self.status = RunStatus::Completed;
        self.error_message = None;
        self
    }

    /// Mark as failed. Anything found so far is dropped.
    #[must_use]
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.new_posts.clear();
        self.new_posts_count = 0;
        self.media_files_count = 0;
        self.date_range_to = self.date_range_from;
        self.status = RunStatus::Failed;
        self.error_message = Some(error.into());
        self
    }

    /// Whether the summary merge should run for this result.
    #[must_use]
    pub fn should_merge(&self) -> bool {
        self.status == RunStatus::Completed && self.new_posts_count > 0
    }
}
