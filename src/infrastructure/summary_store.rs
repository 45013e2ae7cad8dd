//! JSON storage for the export summary.
//!
//! The summary is the only durable, mutable record of an export: every run
//! reads it, folds new posts in, and rewrites the whole file. Writes are a
//! plain overwrite (no temp file + rename), so a crash mid-write can leave a
//! truncated file behind; `load` then reports "no prior summary".

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppError, ExportSummary, Result, UpdateResult};

/// File name of the summary inside the export root.
pub const SUMMARY_FILE_NAME: &str = "summary.json";

/// Reads and writes `summary.json` under one export root.
#[derive(Debug, Clone)]
pub struct SummaryStore {
    path: PathBuf,
}

impl SummaryStore {
    /// Store for the summary under `export_root`.
    #[must_use]
    pub fn new(export_root: &Path) -> Self {
        Self {
            path: export_root.join(SUMMARY_FILE_NAME),
        }
    }

    /// Location of the summary file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the summary. Missing or malformed files both yield `None`.
    #[must_use]
    pub fn load(&self) -> Option<ExportSummary> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read export summary: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Ignoring malformed export summary: {}", e);
                None
            }
        }
    }

    /// Serialize `summary` and overwrite the file.
    ///
    /// # Errors
    /// Returns a persistence error if serialization or the write fails.
    pub fn save(&self, summary: &mut ExportSummary) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::persistence(&self.path, "Failed to create export root", e))?;
        }

        summary.summary_file_path = self.path.display().to_string();

        let json = serde_json::to_string_pretty(summary)
            .map_err(|e| AppError::persistence(&self.path, "Failed to serialize summary", e))?;

        fs::write(&self.path, json)
            .map_err(|e| AppError::persistence(&self.path, "Failed to write summary", e))?;

        tracing::info!(
            path = %self.path.display(),
            total_posts = summary.total_posts,
            "Export summary saved"
        );

        Ok(())
    }

    /// Fold a completed update into `existing`.
    ///
    /// New posts are appended in discovery order, so `posts` is not globally
    /// sorted by time after a merge.
    pub fn merge(existing: &mut ExportSummary, update: &UpdateResult) {
        existing.total_posts += update.new_posts_count;
        existing.export_time = update.update_time;
        existing.media_files_count += update.media_files_count;
        existing.posts.extend(update.new_posts.iter().cloned());
    }

    /// Load, merge `update` in, and write the result back.
    ///
    /// # Errors
    /// Returns a persistence error if there is no readable summary to merge
    /// into or the write fails.
    pub fn apply_update(&self, update: &UpdateResult) -> Result<ExportSummary> {
        let mut existing = self.load().ok_or_else(|| AppError::Persistence {
            path: self.path.clone(),
            message: "No readable export summary to merge into".into(),
            source: None,
        })?;

        Self::merge(&mut existing, update);
        self.save(&mut existing)?;

        tracing::info!(
            new_posts = update.new_posts_count,
            total_posts = existing.total_posts,
            "Merged update into export summary"
        );

        Ok(existing)
    }
}
