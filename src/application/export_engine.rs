//! Full and incremental export runs.
//!
//! Both runs page through the channel newest-first, turn each message into a
//! post, fetch its media, optionally enrich it and write its markdown. A full
//! export rewrites `summary.json` from scratch; an update only collects posts
//! newer than a cutoff and merges them into the existing summary.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{Instrument, Span};

use crate::domain::{
    ChannelHandle, EnrichmentSummary, ExportConfig, ExportSummary, Post, RawMessage, Result,
    UpdateResult,
};
use crate::infrastructure::{ChannelSource, ExportLayout, SummaryStore};

use super::converter::PostConverter;
use super::enrichment::PostEnricher;
use super::media::MediaFetcher;
use super::paging::{scan_until_cutoff, PageCursor};
use super::renderer::ContentRenderer;

/// Drives export runs against one channel source and one export root.
pub struct ExportEngine {
    source: Arc<dyn ChannelSource>,
    config: ExportConfig,
    layout: ExportLayout,
    store: SummaryStore,
    converter: PostConverter,
    media: MediaFetcher,
    renderer: ContentRenderer,
    enricher: Option<PostEnricher>,
}

impl ExportEngine {
    /// Engine writing under `config.root`.
    #[must_use]
    pub fn new(source: Arc<dyn ChannelSource>, config: ExportConfig) -> Self {
        let layout = ExportLayout::new(&config.root);
        let store = SummaryStore::new(layout.root());
        let media = MediaFetcher::new(Arc::clone(&source), layout.media_dir());
        let renderer = ContentRenderer::new(layout.clone());

        Self {
            source,
            config,
            layout,
            store,
            converter: PostConverter::new(),
            media,
            renderer,
            enricher: None,
        }
    }

    /// Enrich every post with a body during runs.
    #[must_use]
    pub fn with_enricher(mut self, enricher: PostEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    #[must_use]
    pub const fn layout(&self) -> &ExportLayout {
        &self.layout
    }

    #[must_use]
    pub const fn store(&self) -> &SummaryStore {
        &self.store
    }

    /// Export the channel history from scratch and overwrite the summary.
    ///
    /// # Errors
    /// Returns error if a page fetch, a post write or the summary write fails.
    /// Post files written before the failure stay on disk.
    pub async fn export(&self, channel: &ChannelHandle, span: Span) -> Result<ExportSummary> {
        self.run_export(channel).instrument(span).await
    }

    /// Collect posts newer than `cutoff` and merge them into the summary.
    ///
    /// Never returns an error: failures are reported through
    /// [`UpdateResult::status`] and `error_message`.
    pub async fn update(
        &self,
        channel: &ChannelHandle,
        cutoff: DateTime<Utc>,
        span: Span,
    ) -> UpdateResult {
        self.run_update(channel, cutoff).instrument(span).await
    }

    async fn run_export(&self, channel: &ChannelHandle) -> Result<ExportSummary> {
        tracing::info!(
            source = self.source.name(),
            channel = %channel.title,
            root = %self.layout.root().display(),
            "Starting full export"
        );

        self.layout.ensure_directories()?;

        let mut summary = ExportSummary::new(self.export_path());
        let mut enrichment = self.enricher.as_ref().map(PostEnricher::start_summary);
        let mut cursor = PageCursor::new(self.config.max_pages);

        while cursor.has_more() {
            if cursor.pages_fetched() > 0 {
                self.pause().await;
            }

            let page = self.fetch_page(channel, &mut cursor).await?;
            if page.is_empty() {
                break;
            }

            for message in &page {
                cursor.advance(message.id);
                if let Some(post) = self.process(message, enrichment.as_mut()).await? {
                    summary.media_files_count += post.media_files.len();
                    summary.posts.push(post.summary(self.config.preview_chars));
                }
            }
        }

        summary.total_posts = summary.posts.len();
        summary.export_time = Utc::now();
        if let Some(mut enrichment) = enrichment {
            enrichment.processing_completed = Utc::now();
            summary.enrichment_summary = Some(enrichment);
        }

        self.store.save(&mut summary)?;

        tracing::info!(
            posts = summary.total_posts,
            media = summary.media_files_count,
            pages = cursor.pages_fetched(),
            "Full export completed"
        );

        Ok(summary)
    }

    async fn run_update(&self, channel: &ChannelHandle, cutoff: DateTime<Utc>) -> UpdateResult {
        tracing::info!(
            source = self.source.name(),
            channel = %channel.title,
            cutoff = %cutoff,
            "Starting incremental update"
        );

        let mut update = UpdateResult::started(cutoff, self.export_path());

        if let Err(e) = self.collect_since(channel, cutoff, &mut update).await {
            tracing::error!("Update failed: {}", e);
            return update.failed(e.to_string());
        }

        let update = update.completed();
        if !update.should_merge() {
            tracing::info!("No new posts since {}", cutoff);
            return update;
        }

        match self.store.apply_update(&update) {
            Ok(_) => {
                tracing::info!(
                    new_posts = update.new_posts_count,
                    media = update.media_files_count,
                    "Incremental update completed"
                );
                update
            }
            Err(e) => {
                tracing::error!("Failed to merge update: {}", e);
                update.failed(e.to_string())
            }
        }
    }

    async fn collect_since(
        &self,
        channel: &ChannelHandle,
        cutoff: DateTime<Utc>,
        update: &mut UpdateResult,
    ) -> Result<()> {
        self.layout.ensure_directories()?;

        // Updates are not part of the persisted enrichment summary.
        let mut enrichment = self.enricher.as_ref().map(PostEnricher::start_summary);
        let mut cursor = PageCursor::new(self.config.update_max_pages);

        while cursor.has_more() {
            if cursor.pages_fetched() > 0 {
                self.pause().await;
            }

            let page = self.fetch_page(channel, &mut cursor).await?;
            if page.is_empty() {
                break;
            }

            let scan = scan_until_cutoff(&page, cutoff);
            for message in &page[..scan.new_count] {
                cursor.advance(message.id);
                if let Some(post) = self.process(message, enrichment.as_mut()).await? {
                    update.media_files_count += post.media_files.len();
                    update.new_posts.push(post.summary(self.config.preview_chars));
                }
            }

            if scan.reached {
                tracing::debug!("Reached posts already captured");
                break;
            }
        }

        if let Some(enrichment) = enrichment {
            tracing::debug!(
                processed = enrichment.processed_posts,
                failed = enrichment.failed_posts,
                "Enrichment during update finished"
            );
        }

        Ok(())
    }

    async fn fetch_page(
        &self,
        channel: &ChannelHandle,
        cursor: &mut PageCursor,
    ) -> Result<Vec<RawMessage>> {
        let page = self
            .source
            .fetch_page(channel, cursor.before(), self.config.page_size)
            .await?;
        cursor.page_fetched();

        tracing::debug!(
            page = cursor.pages_fetched(),
            before = ?cursor.before(),
            messages = page.len(),
            "Fetched page"
        );

        Ok(page)
    }

    /// Convert, fetch media, enrich and write one message.
    ///
    /// `Ok(None)` means the message was skipped.
    async fn process(
        &self,
        message: &RawMessage,
        enrichment: Option<&mut EnrichmentSummary>,
    ) -> Result<Option<Post>> {
        let mut post = match self.converter.convert(message) {
            Ok(post) => post,
            Err(e) => {
                tracing::warn!("{}", e);
                return Ok(None);
            }
        };

        if !message.attachments.is_empty() {
            post.media_files = self.media.fetch_all(post.id, &message.attachments).await;
        }

        if let (Some(enricher), Some(summary)) = (&self.enricher, enrichment) {
            enricher.enrich(&mut post, summary).await;
        }

        self.renderer.write(&post)?;
        Ok(Some(post))
    }

    async fn pause(&self) {
        if self.config.page_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)).await;
        }
    }

    fn export_path(&self) -> String {
        self.layout.root().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{channel, epoch, history, StubEnricher, StubSource};
    use crate::domain::{Attachment, EnrichmentConfig, MediaRef, RunStatus};
    use chrono::Duration as ChronoDuration;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn config(root: &Path, page_size: usize) -> ExportConfig {
        ExportConfig {
            root: root.to_path_buf(),
            page_size,
            page_delay_ms: 0,
            ..Default::default()
        }
    }

    fn engine(source: &Arc<StubSource>, root: &Path, page_size: usize) -> ExportEngine {
        let source: Arc<dyn ChannelSource> = Arc::clone(source) as Arc<dyn ChannelSource>;
        ExportEngine::new(source, config(root, page_size))
    }

    fn ids(posts: &[crate::domain::PostSummary]) -> Vec<i64> {
        posts.iter().map(|p| p.post_id).collect()
    }

    /// Canonical, raw and processed bytes for posts `1..=count`.
    fn read_post_files(layout: &ExportLayout, count: i64) -> Vec<(Vec<u8>, Vec<u8>, Vec<u8>)> {
        (1..=count)
            .map(|id| {
                (
                    fs::read(layout.canonical_post_path(id)).unwrap(),
                    fs::read(layout.raw_post_path(id)).unwrap(),
                    fs::read(layout.processed_post_path(id)).unwrap(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_export_writes_summary_and_posts() {
        let dir = tempdir().unwrap();
        let source = Arc::new(StubSource::new(history(25)));
        let engine = engine(&source, dir.path(), 10);

        let summary = engine.export(&channel(), Span::none()).await.unwrap();

        assert_eq!(summary.total_posts, 25);
        assert_eq!(summary.posts.len(), 25);
        assert_eq!(summary.posts[0].post_id, 25);
        assert_eq!(summary.posts[24].post_id, 1);
        assert!(summary.enrichment_summary.is_none());
        // Three full pages plus the empty page that ends the run.
        assert_eq!(source.fetch_count(), 4);

        let layout = engine.layout();
        assert!(layout.canonical_post_path(13).is_file());
        assert!(layout.raw_post_path(13).is_file());
        assert!(!layout.processed_post_path(13).exists());
        assert_eq!(engine.store().load().unwrap(), summary);
    }

    #[tokio::test]
    async fn test_export_is_idempotent() {
        let dir = tempdir().unwrap();
        let source = Arc::new(StubSource::new(history(12)));
        let enrichment = EnrichmentConfig {
            enabled: true,
            processing_delay_ms: 0,
            ..Default::default()
        };
        let engine = engine(&source, dir.path(), 5)
            .with_enricher(PostEnricher::new(Arc::new(StubEnricher), &enrichment));

        let first = engine.export(&channel(), Span::none()).await.unwrap();
        let first_files = read_post_files(engine.layout(), 12);
        let second = engine.export(&channel(), Span::none()).await.unwrap();
        let second_files = read_post_files(engine.layout(), 12);

        assert_eq!(first.posts, second.posts);
        assert_eq!(first.total_posts, 12);
        assert_eq!(first.total_posts, second.total_posts);
        assert_eq!(first.media_files_count, second.media_files_count);
        assert_eq!(
            second.enrichment_summary.map(|e| e.processed_posts),
            Some(12)
        );
        assert_eq!(first_files, second_files);
        for (canonical, _, processed) in &first_files {
            assert_eq!(canonical, processed);
        }
    }

    #[tokio::test]
    async fn test_export_pages_past_unrepresentable_timestamps() {
        let dir = tempdir().unwrap();
        let mut messages = history(3);
        let mut broken = RawMessage::text(4, epoch(), "post number 4");
        broken.timestamp = i64::MAX;
        messages.push(broken);
        let source = Arc::new(StubSource::new(messages));
        let engine = engine(&source, dir.path(), 1);

        let summary = engine.export(&channel(), Span::none()).await.unwrap();

        assert_eq!(summary.total_posts, 3);
        assert_eq!(ids(&summary.posts), vec![3, 2, 1]);
        assert!(!engine.layout().canonical_post_path(4).exists());
    }

    #[tokio::test]
    async fn test_export_respects_page_cap() {
        let dir = tempdir().unwrap();
        let source = Arc::new(StubSource::new(history(500)));
        let engine = engine(&source, dir.path(), 10);

        let summary = engine.export(&channel(), Span::none()).await.unwrap();

        assert_eq!(source.fetch_count(), 20);
        assert_eq!(summary.total_posts, 200);
        assert_eq!(summary.posts.last().map(|p| p.post_id), Some(301));
    }

    #[tokio::test]
    async fn test_export_skips_bad_messages() {
        let dir = tempdir().unwrap();
        let mut messages = history(6);
        messages[2].views = Some(-5);
        let source = Arc::new(StubSource::new(messages));
        let engine = engine(&source, dir.path(), 4);

        let summary = engine.export(&channel(), Span::none()).await.unwrap();

        assert_eq!(ids(&summary.posts), vec![6, 5, 4, 2, 1]);
        assert_eq!(summary.total_posts, 5);
        assert!(!engine.layout().canonical_post_path(3).exists());
    }

    #[tokio::test]
    async fn test_export_tolerates_partial_media() {
        let dir = tempdir().unwrap();
        let mut messages = history(2);
        messages[1].attachments = vec![
            Attachment::Photo { media_ref: MediaRef("ok".into()) },
            Attachment::Document {
                media_ref: MediaRef("gone".into()),
                file_name: None,
                mime_type: Some("video/mp4".into()),
            },
        ];
        let source = Arc::new(StubSource::new(messages).with_blob("ok", b"jpeg"));
        let engine = engine(&source, dir.path(), 10);

        let summary = engine.export(&channel(), Span::none()).await.unwrap();

        assert_eq!(summary.total_posts, 2);
        assert_eq!(summary.media_files_count, 1);
        assert!(engine.layout().media_dir().join("2_photo.jpg").is_file());
        let rendered = fs::read_to_string(engine.layout().canonical_post_path(2)).unwrap();
        assert!(rendered.contains("![2_photo.jpg](./media/2_photo.jpg)"));
        assert!(!rendered.contains("2_document.mp4"));
    }

    #[tokio::test]
    async fn test_export_failure_keeps_previous_summary() {
        let dir = tempdir().unwrap();
        let healthy = Arc::new(StubSource::new(history(8)));
        engine(&healthy, dir.path(), 5)
            .export(&channel(), Span::none())
            .await
            .unwrap();
        let before = fs::read(dir.path().join("summary.json")).unwrap();

        let flaky = Arc::new(StubSource::new(history(12)).failing_on_fetch(2));
        let result = engine(&flaky, dir.path(), 5)
            .export(&channel(), Span::none())
            .await;

        assert!(result.is_err());
        assert_eq!(fs::read(dir.path().join("summary.json")).unwrap(), before);
    }

    #[tokio::test]
    async fn test_export_with_enrichment() {
        let dir = tempdir().unwrap();
        let mut messages = history(3);
        messages[0].text = Some("boom".into());
        let source = Arc::new(StubSource::new(messages));
        let enrichment = EnrichmentConfig {
            enabled: true,
            processing_delay_ms: 0,
            ..Default::default()
        };
        let engine = engine(&source, dir.path(), 10)
            .with_enricher(PostEnricher::new(Arc::new(StubEnricher), &enrichment));

        let summary = engine.export(&channel(), Span::none()).await.unwrap();

        let stats = summary.enrichment_summary.unwrap();
        assert_eq!(stats.provider, "stub");
        assert_eq!(stats.total_posts, 3);
        assert_eq!(stats.processed_posts, 2);
        assert_eq!(stats.failed_posts, 1);

        let layout = engine.layout();
        let canonical = fs::read_to_string(layout.canonical_post_path(3)).unwrap();
        assert!(canonical.starts_with("# About post\n"));
        assert_eq!(
            canonical,
            fs::read_to_string(layout.processed_post_path(3)).unwrap()
        );
        assert!(!layout.processed_post_path(1).exists());
    }

    #[tokio::test]
    async fn test_update_collects_only_newer_posts() {
        let dir = tempdir().unwrap();
        let old = Arc::new(StubSource::new(history(10)));
        let engine_old = engine(&old, dir.path(), 4);
        let initial = engine_old.export(&channel(), Span::none()).await.unwrap();
        let cutoff = initial.latest_post_time().unwrap();

        let source = Arc::new(StubSource::new(history(15)));
        let engine = engine(&source, dir.path(), 4);
        let update = engine.update(&channel(), cutoff, Span::none()).await;

        assert_eq!(update.status, RunStatus::Completed);
        assert_eq!(ids(&update.new_posts), vec![15, 14, 13, 12, 11]);
        assert_eq!(update.date_range_from, cutoff);
        assert_eq!(update.date_range_to, epoch() + ChronoDuration::hours(15));
        // Page one holds 15..12, page two reaches the cutoff at 10.
        assert_eq!(source.fetch_count(), 2);

        let merged = engine.store().load().unwrap();
        assert_eq!(merged.total_posts, 15);
        assert_eq!(ids(&merged.posts[10..]), vec![15, 14, 13, 12, 11]);
        assert_eq!(merged.export_time, update.update_time);
    }

    #[tokio::test]
    async fn test_update_without_new_posts_does_not_merge() {
        let dir = tempdir().unwrap();
        let source = Arc::new(StubSource::new(history(5)));
        let engine = engine(&source, dir.path(), 10);
        let initial = engine.export(&channel(), Span::none()).await.unwrap();
        let before = fs::read(engine.store().path()).unwrap();

        let update = engine
            .update(&channel(), initial.latest_post_time().unwrap(), Span::none())
            .await;

        assert_eq!(update.status, RunStatus::Completed);
        assert_eq!(update.new_posts_count, 0);
        assert_eq!(update.date_range_to, update.date_range_from);
        assert_eq!(fs::read(engine.store().path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_failure_leaves_summary_untouched() {
        let dir = tempdir().unwrap();
        let old = Arc::new(StubSource::new(history(3)));
        let initial = engine(&old, dir.path(), 10)
            .export(&channel(), Span::none())
            .await
            .unwrap();
        let before = fs::read(dir.path().join("summary.json")).unwrap();

        let flaky = Arc::new(StubSource::new(history(30)).failing_on_fetch(2));
        let engine = engine(&flaky, dir.path(), 5);
        let update = engine
            .update(&channel(), initial.latest_post_time().unwrap(), Span::none())
            .await;

        assert_eq!(update.status, RunStatus::Failed);
        assert!(update.new_posts.is_empty());
        assert!(update.error_message.unwrap().contains("connection reset"));
        assert_eq!(fs::read(dir.path().join("summary.json")).unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_respects_page_cap() {
        let dir = tempdir().unwrap();
        let source = Arc::new(StubSource::new(history(500)));
        let engine = engine(&source, dir.path(), 10);
        let mut seed = ExportSummary::new(dir.path().display().to_string());
        engine.store().save(&mut seed).unwrap();

        let update = engine.update(&channel(), epoch(), Span::none()).await;

        assert_eq!(source.fetch_count(), 10);
        assert_eq!(update.new_posts_count, 100);
        assert_eq!(engine.store().load().unwrap().total_posts, 100);
    }

    #[tokio::test]
    async fn test_update_merge_failure_is_reported() {
        let dir = tempdir().unwrap();
        let source = Arc::new(StubSource::new(history(4)));
        let engine = engine(&source, dir.path(), 10);

        let update = engine.update(&channel(), epoch(), Span::none()).await;

        assert_eq!(update.status, RunStatus::Failed);
        assert!(update.error_message.unwrap().contains("summary.json"));
        assert!(!engine.store().path().exists());
    }
}
