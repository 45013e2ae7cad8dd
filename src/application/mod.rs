//! Application layer - use cases and orchestration.
//!
//! This layer turns channel messages into posts, renders them to disk and
//! keeps the export summary current.

pub mod converter;
pub mod enrichment;
pub mod export_engine;
pub mod formatter;
pub mod media;
pub mod paging;
pub mod renderer;

#[cfg(test)]
pub(crate) mod test_support;

pub use enrichment::PostEnricher;
pub use export_engine::ExportEngine;
pub use formatter::{
    format_export_result, format_posts_json, format_posts_table, format_stats,
    format_update_result, recent_posts, OutputFormat,
};
