//! Terminal output for export summaries and run results.
//!
//! Supports a table view and JSON for listing posts.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{ExportSummary, PostSummary, RunStatus, UpdateResult};

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Compact table listing.
    #[default]
    Table,
    /// JSON format for programmatic use.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: table, json")),
        }
    }
}

/// The `limit` most recently created posts, newest first.
#[must_use]
pub fn recent_posts(summary: &ExportSummary, limit: usize) -> Vec<&PostSummary> {
    let mut posts: Vec<&PostSummary> = summary.posts.iter().collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.post_id.cmp(&a.post_id)));
    posts.truncate(limit);
    posts
}

/// Formats a table listing of posts.
pub fn format_posts_table(posts: &[&PostSummary]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Created", "Views", "Reacts", "Fwd", "Preview"]);

    for post in posts {
        let created = post.created_at.format("%Y-%m-%d %H:%M").to_string();
        let id = if post.is_edited {
            format!("{}*", post.post_id)
        } else {
            post.post_id.to_string()
        };

        table.add_row(vec![
            id,
            created,
            post.views.to_string(),
            post.reactions.to_string(),
            post.total_forwards.to_string(),
            truncate(&post.content_preview, 40),
        ]);
    }

    table.to_string()
}

/// Formats posts as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_posts_json(posts: &[&PostSummary]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(posts)
}

/// Formats archive statistics for display.
pub fn format_stats(summary: &ExportSummary) -> String {
    let range = match (summary.earliest_post_time(), summary.latest_post_time()) {
        (Some(from), Some(to)) => format!(
            "{} → {}",
            from.format("%Y-%m-%d %H:%M"),
            to.format("%Y-%m-%d %H:%M")
        ),
        _ => "-".to_string(),
    };
    let views: u64 = summary.posts.iter().map(|p| p.views).sum();
    let reactions: u64 = summary.posts.iter().map(|p| p.reactions).sum();

    let mut out = format!(
        "{}\n  Posts: {}\n  Media files: {}\n  Total views: {}\n  Total reactions: {}\n  Date range: {}\n  Last export: {}",
        "📊 Statistics".bold(),
        summary.total_posts.to_string().cyan(),
        summary.media_files_count.to_string().cyan(),
        views.to_string().green(),
        reactions.to_string().green(),
        range.yellow(),
        summary.export_time.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if let Some(enrichment) = &summary.enrichment_summary {
        out.push_str(&format!(
            "\n  Enriched: {}/{} via {} ({} failed, {}s)",
            enrichment.processed_posts.to_string().green(),
            enrichment.total_posts,
            enrichment.provider,
            enrichment.failed_posts.to_string().red(),
            enrichment.duration().num_seconds()
        ));
    }

    out
}

/// One-line report of a finished full export.
pub fn format_export_result(summary: &ExportSummary) -> String {
    format!(
        "{} Exported {} posts ({} media files) to {}",
        "✓".green(),
        summary.total_posts.to_string().cyan(),
        summary.media_files_count,
        summary.export_path
    )
}

/// Report of an incremental update.
pub fn format_update_result(update: &UpdateResult) -> String {
    match update.status {
        RunStatus::Completed if update.new_posts_count == 0 => format!(
            "{} No new posts since {}",
            "✓".green(),
            update.date_range_from.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        RunStatus::Completed => format!(
            "{} Added {} new posts ({} media files), {} → {}",
            "✓".green(),
            update.new_posts_count.to_string().cyan(),
            update.media_files_count,
            update.date_range_from.format("%Y-%m-%d %H:%M"),
            update.date_range_to.format("%Y-%m-%d %H:%M")
        ),
        RunStatus::Started | RunStatus::Failed => format!(
            "{} Update {}: {}",
            "✗".red(),
            update.status,
            update.error_message.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Truncates a string to max characters with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Post;
    use chrono::{TimeZone, Utc};

    fn summary() -> ExportSummary {
        let mut summary = ExportSummary::new("./exports");
        for (id, day) in [(3_i64, 5_u32), (1, 1), (2, 9)] {
            summary.posts.push(
                Post {
                    id,
                    created_at: Utc.with_ymd_and_hms(2024, 2, day, 0, 0, 0).unwrap(),
                    views: 10,
                    content: format!("post {id}"),
                    ..Default::default()
                }
                .summary(100),
            );
        }
        summary.total_posts = 3;
        summary
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world!", 8), "hello...");
        assert_eq!(truncate("первая\nвторая", 20), "первая");
    }

    #[test]
    fn test_output_format_from_str() {
        assert!(matches!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table)));
        assert!(matches!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!("markdown".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_recent_posts_newest_first() {
        let summary = summary();
        let ids: Vec<i64> = recent_posts(&summary, 2).iter().map(|p| p.post_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_posts_table_and_json() {
        let summary = summary();
        let posts = recent_posts(&summary, 10);

        let table = format_posts_table(&posts);
        assert!(table.contains("Preview"));
        assert!(table.contains("post 2"));

        let json = format_posts_json(&posts).unwrap();
        assert!(json.contains("\"postId\": 2"));
    }

    #[test]
    fn test_format_update_result() {
        let cutoff = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let empty = UpdateResult::started(cutoff, "./exports").completed();
        assert!(format_update_result(&empty).contains("No new posts"));

        let failed = UpdateResult::started(cutoff, "./exports").failed("network down");
        assert!(format_update_result(&failed).contains("network down"));
    }
}
