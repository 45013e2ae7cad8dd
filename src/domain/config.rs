//! Application configuration models.
//!
//! Covers where the channel dump lives, how the export is paged and laid out
//! on disk, and how the optional enrichment service is reached.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where messages come from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    /// Path to the `SQLite` channel dump.
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Channel id, `@username` or title fragment.
    #[serde(default)]
    pub channel: String,
}

/// Paging and output layout for export runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Root directory of the archive.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Messages requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Page cap for a full export.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Page cap for an incremental update.
    #[serde(default = "default_update_max_pages")]
    pub update_max_pages: usize,

    /// Pause between page requests, in milliseconds.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Characters kept in each post's summary preview.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            update_max_pages: default_update_max_pages(),
            page_delay_ms: default_page_delay_ms(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./exports")
}

const fn default_page_size() -> usize {
    100
}

const fn default_max_pages() -> usize {
    20
}

const fn default_update_max_pages() -> usize {
    10
}

const fn default_page_delay_ms() -> u64 {
    100
}

const fn default_preview_chars() -> usize {
    200
}

/// Settings for the title/hashtag enrichment service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Whether posts are enriched during export.
    #[serde(default)]
    pub enabled: bool,

    /// Provider name recorded on enriched posts.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the generation endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_true")]
    pub generate_title: bool,

    #[serde(default = "default_true")]
    pub extract_hashtags: bool,

    #[serde(default = "default_max_hashtags")]
    pub max_hashtags: usize,

    /// Language the title and tags should be written in.
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP timeout for a single generation call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between enriched posts, in milliseconds.
    #[serde(default = "default_processing_delay_ms")]
    pub processing_delay_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            generate_title: true,
            extract_hashtags: true,
            max_hashtags: default_max_hashtags(),
            language: default_language(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            processing_delay_ms: default_processing_delay_ms(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_max_hashtags() -> usize {
    5
}

fn default_language() -> String {
    "English".to_string()
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_max_tokens() -> u32 {
    200
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_processing_delay_ms() -> u64 {
    1000
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

impl AppConfig {
    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".channel-archiver")
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Fail early on settings that would make a run meaningless.
    ///
    /// # Errors
    /// Returns a message describing the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.export.page_size == 0 {
            return Err("export.page_size must be greater than 0".into());
        }
        if self.export.max_pages == 0 || self.export.update_max_pages == 0 {
            return Err("export.max_pages and export.update_max_pages must be greater than 0".into());
        }
        if self.enrichment.enabled && self.enrichment.base_url.trim().is_empty() {
            return Err("enrichment.base_url is required when enrichment is enabled".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.export.page_size, 100);
        assert_eq!(config.export.max_pages, 20);
        assert_eq!(config.export.update_max_pages, 10);
        assert_eq!(config.export.preview_chars, 200);
        assert!(!config.enrichment.enabled);
        assert_eq!(config.enrichment.max_hashtags, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = AppConfig::default();
        config.export.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_base_url_when_enabled() {
        let mut config = AppConfig::default();
        config.enrichment.enabled = true;
        config.enrichment.base_url = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_path() {
        let path = AppConfig::default_config_path();
        assert!(path.ends_with(".channel-archiver/config.toml"));
    }
}
