//! Attachment download and naming.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::{Attachment, ItemError, MediaRef};
use crate::infrastructure::ChannelSource;

/// Downloads attachments through a [`ChannelSource`] into the media directory.
pub struct MediaFetcher {
    source: Arc<dyn ChannelSource>,
    media_dir: PathBuf,
}

impl MediaFetcher {
    #[must_use]
    pub fn new(source: Arc<dyn ChannelSource>, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            media_dir: media_dir.into(),
        }
    }

    /// Download every supported attachment of `post_id`, in order.
    ///
    /// Returns the file names that were written. Failed items are logged and
    /// left out; they never fail the post.
    pub async fn fetch_all(&self, post_id: i64, attachments: &[Attachment]) -> Vec<String> {
        let mut files = Vec::new();
        let mut photo_index = 0;

        for attachment in attachments {
            let (file_name, media_ref) = match attachment {
                Attachment::Photo { media_ref } => {
                    photo_index += 1;
                    (photo_file_name(post_id, photo_index), media_ref)
                }
                Attachment::Document {
                    media_ref,
                    file_name,
                    mime_type,
                } => (
                    document_file_name(post_id, file_name.as_deref(), mime_type.as_deref()),
                    media_ref,
                ),
                Attachment::Unsupported { kind } => {
                    tracing::debug!(post_id, kind = %kind, "Skipping unsupported attachment");
                    continue;
                }
            };

            match self.fetch_one(post_id, &file_name, media_ref).await {
                Ok(()) => {
                    tracing::debug!(post_id, file = %file_name, "Downloaded attachment");
                    files.push(file_name);
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }

        files
    }

    async fn fetch_one(
        &self,
        post_id: i64,
        file_name: &str,
        media_ref: &MediaRef,
    ) -> Result<(), ItemError> {
        let failed = |reason: String| ItemError::MediaDownload {
            post_id,
            file_name: file_name.to_string(),
            reason,
        };

        let data = self
            .source
            .download_blob(media_ref)
            .await
            .map_err(|e| failed(e.to_string()))?;

        fs::create_dir_all(&self.media_dir).map_err(|e| failed(e.to_string()))?;
        fs::write(self.media_dir.join(file_name), data).map_err(|e| failed(e.to_string()))
    }
}

/// `{id}_photo.jpg` for the first photo, `{id}_photo_{n}.jpg` after that.
#[must_use]
pub fn photo_file_name(post_id: i64, position: usize) -> String {
    if position <= 1 {
        format!("{post_id}_photo.jpg")
    } else {
        format!("{post_id}_photo_{position}.jpg")
    }
}

/// `{id}_{name}` when the document has a name, else `{id}_document{ext}`.
#[must_use]
pub fn document_file_name(post_id: i64, file_name: Option<&str>, mime_type: Option<&str>) -> String {
    match file_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => format!("{post_id}_{}", sanitize_file_name(name)),
        None => format!("{post_id}_document{}", extension_for_mime(mime_type.unwrap_or(""))),
    }
}

/// Replace path separators and control characters so a name stays inside
/// the media directory.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "video/mp4" => ".mp4",
        "audio/mpeg" => ".mp3",
        "application/pdf" => ".pdf",
        _ => "",
    }
}
