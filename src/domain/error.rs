//! Domain-level error types for channel-archiver.
//!
//! [`AppError`] aborts the current run. [`ItemError`] only drops a single
//! message, attachment or enrichment step and the run continues.

use std::path::PathBuf;
use thiserror::Error;

/// Run-level errors. Any of these ends the current export or update.
#[derive(Error, Debug)]
pub enum AppError {
    /// The channel source refused our credentials or is not usable.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The configured channel identifier did not resolve.
    #[error("Channel not found: {identifier}")]
    ChannelNotFound { identifier: String },

    /// Paging or blob transfer against the channel source failed.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Reading or writing the export summary failed.
    #[error("Persistence error at {}: {message}", .path.display())]
    Persistence {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to open the channel dump database.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a database error from rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a transport error wrapping any source-side failure.
    pub fn transport(
        message: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a persistence error for the given summary path.
    pub fn persistence(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Failures local to one message or one attachment.
#[derive(Error, Debug)]
pub enum ItemError {
    /// The raw message could not be mapped to a post.
    #[error("Message {message_id} skipped: {reason}")]
    Conversion { message_id: i64, reason: String },

    /// A single attachment could not be downloaded or stored.
    #[error("Attachment {file_name} of post {post_id} omitted: {reason}")]
    MediaDownload {
        post_id: i64,
        file_name: String,
        reason: String,
    },

    /// The enrichment service failed for one post.
    #[error("Enrichment of post {post_id} failed: {reason}")]
    Enrichment { post_id: i64, reason: String },
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_message_includes_path() {
        let err = AppError::persistence(
            "/tmp/exports/summary.json",
            "write failed",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/exports/summary.json"));
        assert!(msg.contains("write failed"));
    }

    #[test]
    fn test_item_error_display() {
        let err = ItemError::Conversion {
            message_id: 42,
            reason: "negative view count".into(),
        };
        assert_eq!(err.to_string(), "Message 42 skipped: negative view count");
    }
}
