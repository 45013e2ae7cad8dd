//! On-disk layout of an export.
//!
//! ```text
//! {root}/summary.json
//! {root}/{id}.md            canonical rendering
//! {root}/raw/{id}.md        raw capture
//! {root}/processed/{id}.md  enriched rendering
//! {root}/media/{file}       downloaded attachments
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppError, Result};

use super::summary_store::SUMMARY_FILE_NAME;

const RAW_DIR: &str = "raw";
const PROCESSED_DIR: &str = "processed";
const MEDIA_DIR: &str = "media";

/// Resolved directories for one export root.
#[derive(Debug, Clone)]
pub struct ExportLayout {
    root: PathBuf,
}

impl ExportLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW_DIR)
    }

    #[must_use]
    pub fn processed_dir(&self) -> PathBuf {
        self.root.join(PROCESSED_DIR)
    }

    #[must_use]
    pub fn media_dir(&self) -> PathBuf {
        self.root.join(MEDIA_DIR)
    }

    #[must_use]
    pub fn summary_path(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE_NAME)
    }

    /// Canonical `{id}.md` path.
    #[must_use]
    pub fn canonical_post_path(&self, post_id: i64) -> PathBuf {
        self.root.join(post_file_name(post_id))
    }

    #[must_use]
    pub fn raw_post_path(&self, post_id: i64) -> PathBuf {
        self.raw_dir().join(post_file_name(post_id))
    }

    #[must_use]
    pub fn processed_post_path(&self, post_id: i64) -> PathBuf {
        self.processed_dir().join(post_file_name(post_id))
    }

    /// Create the root and all subdirectories.
    ///
    /// # Errors
    /// Returns error if any directory cannot be created.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.raw_dir(),
            self.processed_dir(),
            self.media_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| {
                AppError::io(format!("Failed to create directory {}", dir.display()), e)
            })?;
        }

        tracing::debug!("Export layout ready at: {}", self.root.display());
        Ok(())
    }
}

fn post_file_name(post_id: i64) -> String {
    format!("{post_id}.md")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths() {
        let layout = ExportLayout::new("/data/exports");
        assert_eq!(
            layout.canonical_post_path(42),
            PathBuf::from("/data/exports/42.md")
        );
        assert_eq!(
            layout.raw_post_path(42),
            PathBuf::from("/data/exports/raw/42.md")
        );
        assert_eq!(
            layout.processed_post_path(42),
            PathBuf::from("/data/exports/processed/42.md")
        );
        assert_eq!(
            layout.summary_path(),
            PathBuf::from("/data/exports/summary.json")
        );
    }

    #[test]
    fn test_ensure_directories() {
        let dir = tempdir().unwrap();
        let layout = ExportLayout::new(dir.path().join("exports"));
        layout.ensure_directories().unwrap();
        assert!(layout.raw_dir().is_dir());
        assert!(layout.processed_dir().is_dir());
        assert!(layout.media_dir().is_dir());
    }
}
