//! Infrastructure layer - external adapters (channel dump, filesystem, HTTP).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod channel_source;
pub mod config;
pub mod enricher;
pub mod export_layout;
pub mod sqlite_source;
pub mod summary_store;

pub use channel_source::ChannelSource;
pub use config::{config_file_path, ensure_config_exists, load_config, save_config};
pub use enricher::{Enricher, OllamaEnricher};
pub use export_layout::ExportLayout;
pub use sqlite_source::SqliteChannelSource;
pub use summary_store::SummaryStore;
