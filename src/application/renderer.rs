//! Markdown rendering of posts.
//!
//! Every post gets a raw capture under `raw/`. Enriched posts also get a
//! titled rendering under `processed/`. The root `{id}.md` is the enriched
//! rendering when there is one, else the raw capture.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::domain::{AppError, Post, Result};
use crate::infrastructure::ExportLayout;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders posts and writes them into an [`ExportLayout`].
#[derive(Debug, Clone)]
pub struct ContentRenderer {
    layout: ExportLayout,
}

impl ContentRenderer {
    #[must_use]
    pub const fn new(layout: ExportLayout) -> Self {
        Self { layout }
    }

    /// Metadata, media references, then the body.
    #[must_use]
    pub fn render_raw(post: &Post) -> String {
        let mut out = metadata_block(post);
        out.push('\n');
        out.push_str(&body_section(post));
        out
    }

    /// Title heading, metadata, enrichment details, then the body.
    #[must_use]
    pub fn render_enriched(post: &Post) -> String {
        let title = post
            .generated_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map_or_else(|| format!("Post {}", post.id), ToString::to_string);

        let mut out = format!("# {title}\n\n");
        out.push_str(&metadata_block(post));
        let _ = writeln!(out, "**Enrichment:** applied by {}", post.enrichment_provider);
        out.push('\n');

        if !post.hashtags.is_empty() {
            let tags: Vec<String> = post.hashtags.iter().map(|h| format!("#{h}")).collect();
            let _ = writeln!(out, "**Tags:** {}\n", tags.join(" "));
        }

        out.push_str("## Content\n\n");
        out.push_str(&body_section(post));
        out
    }

    /// The rendering that goes into the root `{id}.md`.
    #[must_use]
    pub fn canonical(post: &Post) -> String {
        if post.is_enriched {
            Self::render_enriched(post)
        } else {
            Self::render_raw(post)
        }
    }

    /// Write all files for `post`, overwriting earlier renderings.
    ///
    /// A processed rendering left by an earlier enriched run is removed when
    /// `post` is not enriched.
    ///
    /// # Errors
    /// Returns an IO error if any file cannot be written or removed.
    pub fn write(&self, post: &Post) -> Result<()> {
        let raw = Self::render_raw(post);
        write_file(&self.layout.raw_post_path(post.id), &raw)?;

        let processed_path = self.layout.processed_post_path(post.id);
        let canonical = if post.is_enriched {
            let enriched = Self::render_enriched(post);
            write_file(&processed_path, &enriched)?;
            enriched
        } else {
            remove_stale(&processed_path)?;
            raw
        };

        write_file(&self.layout.canonical_post_path(post.id), &canonical)
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create {}", parent.display()), e))?;
    }
    fs::write(path, content)
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))
}

fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed stale rendering {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::io(format!("Failed to remove {}", path.display()), e)),
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    format!("{} UTC", at.format(TIMESTAMP_FORMAT))
}

fn metadata_block(post: &Post) -> String {
    let mut out = format!("**Created:** {}\n", timestamp(post.created_at));
    if post.is_edited {
        if let Some(edited_at) = post.edited_at {
            let _ = writeln!(out, "**Edited:** {}", timestamp(edited_at));
        }
    }
    let _ = writeln!(out, "**Views:** {}", post.views);
    let _ = writeln!(out, "**Reactions:** {}", post.reactions);
    let _ = writeln!(out, "**Forwards:** {}", post.total_forwards);
    out
}

fn body_section(post: &Post) -> String {
    let mut out = String::new();

    for file in &post.media_files {
        out.push_str(&media_markdown(file));
    }

    if post.has_content() {
        if !post.media_files.is_empty() {
            out.push('\n');
        }
        out.push_str(&post.content);
        out.push('\n');
    } else if post.media_files.is_empty() {
        out.push_str("[No content]\n");
    }

    out
}

/// Markdown reference for one media file, chosen by extension.
fn media_markdown(file: &str) -> String {
    let extension = Path::new(file)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let link = format!("./media/{file}");

    match extension.as_str() {
        "jpg" | "jpeg" | "png" | "gif" => format!("![{file}]({link})\n\n"),
        "mp4" | "mov" | "avi" => format!("🎬 **Video:** [Click to view {file}]({link})\n\n"),
        "mp3" | "wav" | "ogg" => format!("🎵 **Audio:** [Click to play {file}]({link})\n\n"),
        "pdf" => format!("📄 **Document:** [Click to open {file}]({link})\n\n"),
        _ => format!("📎 **File:** [Download {file}]({link})\n\n"),
    }
}
