//! Capability contract for anything that can serve channel history.

use async_trait::async_trait;

use crate::domain::{ChannelHandle, MediaRef, RawMessage, Result};

/// A paginated, newest-first source of channel messages.
///
/// Implementations are expected to return pages ordered by strictly
/// decreasing id, where `before` is an exclusive upper bound on the ids
/// returned. `None` means "start from the most recent message".
#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// Check credentials / connectivity. `Ok(false)` means the source is
    /// reachable but refused us.
    async fn authenticate(&self) -> Result<bool>;

    /// Resolve a user-supplied identifier (numeric id, `@username`, title).
    async fn resolve_channel(&self, identifier: &str) -> Result<Option<ChannelHandle>>;

    /// Fetch up to `page_size` messages older than `before`.
    async fn fetch_page(
        &self,
        handle: &ChannelHandle,
        before: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<RawMessage>>;

    /// Download one media blob.
    async fn download_blob(&self, media: &MediaRef) -> Result<Vec<u8>>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
