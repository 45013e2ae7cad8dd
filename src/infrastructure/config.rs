//! Configuration file management.
//!
//! Handles loading and saving TOML configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# Channel Archiver Configuration
# Auto-generated - edit as needed

[source]
# SQLite dump holding the channel history
# database = "/path/to/channel.db"

# Channel id, @username or part of the title
channel = ""

[export]
# Archive root (summary.json, raw/, processed/, media/)
root = "./exports"

# Messages per page and page caps for full export / incremental update
page_size = 100
max_pages = 20
update_max_pages = 10

# Pause between pages in milliseconds
page_delay_ms = 100

# Characters kept in each post preview in summary.json
preview_chars = 200

[enrichment]
# Generate titles and hashtags while exporting
enabled = false
provider = "ollama"
base_url = "http://localhost:11434"
model = "llama3.2"
generate_title = true
extract_hashtags = true
max_hashtags = 5
language = "English"
temperature = 0.7
max_tokens = 200
timeout_secs = 30

# Pause between enriched posts in milliseconds
processing_delay_ms = 1000
"#;

/// Load configuration from `path`, or the default location, or defaults.
///
/// An explicit path must exist; the default location is optional.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config_from_file(path),
        None => {
            let default_path = config_file_path();
            if default_path.exists() {
                load_config_from_file(&default_path)
            } else {
                tracing::debug!("No config file found, using defaults");
                Ok(AppConfig::default())
            }
        }
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Save configuration to file.
///
/// # Errors
/// Returns error if file cannot be written.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })?;

    fs::write(path, content)
        .map_err(|e| AppError::io(format!("Failed to write config file: {}", path.display()), e))?;

    tracing::info!(path = %path.display(), "Configuration saved");

    Ok(())
}

/// Create the commented default configuration file if it doesn't exist.
///
/// Returns `true` when a new file was written.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| AppError::io("Failed to create default config", e))?;

    tracing::info!(path = %path.display(), "Created default configuration");

    Ok(true)
}

/// Get the path to the default configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    AppConfig::default_config_path()
}
