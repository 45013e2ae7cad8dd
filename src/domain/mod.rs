//! Domain layer - core types and errors.
//!
//! This layer contains pure domain models and error types
//! without any external dependencies (DB, IO, etc.).

pub mod config;
pub mod error;
pub mod models;

pub use config::{AppConfig, EnrichmentConfig, ExportConfig, SourceConfig};
pub use error::{AppError, ItemError, Result};
pub use models::{
    Attachment, ChannelHandle, EnrichmentSummary, ExportSummary, MediaRef, Post, PostSummary,
    RawMessage, Reaction, RunStatus, UpdateResult,
};
