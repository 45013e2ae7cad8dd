//! Applying an [`Enricher`] to converted posts.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{EnrichmentConfig, EnrichmentSummary, ItemError, Post};
use crate::infrastructure::Enricher;

/// Titles and tags posts, tracking outcomes in an [`EnrichmentSummary`].
pub struct PostEnricher {
    enricher: Arc<dyn Enricher>,
    generate_title: bool,
    extract_hashtags: bool,
    max_hashtags: usize,
    delay: Duration,
}

impl PostEnricher {
    #[must_use]
    pub fn new(enricher: Arc<dyn Enricher>, config: &EnrichmentConfig) -> Self {
        Self {
            enricher,
            generate_title: config.generate_title,
            extract_hashtags: config.extract_hashtags,
            max_hashtags: config.max_hashtags,
            delay: Duration::from_millis(config.processing_delay_ms),
        }
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        self.enricher.provider()
    }

    /// Fresh summary for one run.
    #[must_use]
    pub fn start_summary(&self) -> EnrichmentSummary {
        EnrichmentSummary::started(self.provider())
    }

    /// Enrich `post` in place. Posts without a body are counted but left
    /// alone. A failure leaves the post un-enriched and is recorded.
    pub async fn enrich(&self, post: &mut Post, summary: &mut EnrichmentSummary) {
        summary.total_posts += 1;
        if !post.has_content() {
            return;
        }

        match self.apply(post).await {
            Ok(()) => {
                summary.processed_posts += 1;
                if post.generated_title.is_some() {
                    summary.titles_generated += 1;
                }
                summary.hashtags_extracted += post.hashtags.len();
            }
            Err(e) => {
                tracing::warn!("{}", e);
                summary.failed_posts += 1;
                summary.errors.push(e.to_string());
            }
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    async fn apply(&self, post: &mut Post) -> Result<(), ItemError> {
        let post_id = post.id;
        let failed = move |reason: String| ItemError::Enrichment { post_id, reason };

        let title = if self.generate_title {
            let title = self
                .enricher
                .generate_title(&post.content)
                .await
                .map_err(|e| failed(e.to_string()))?;
            Some(title).filter(|t| !t.is_empty())
        } else {
            None
        };

        let hashtags = if self.extract_hashtags {
            self.enricher
                .extract_hashtags(&post.content, self.max_hashtags)
                .await
                .map_err(|e| failed(e.to_string()))?
        } else {
            Vec::new()
        };

        post.generated_title = title;
        post.hashtags = hashtags;
        post.is_enriched = true;
        post.enrichment_provider = self.provider().to_string();

        tracing::debug!(post_id = post.id, "Post enriched");
        Ok(())
    }
}
