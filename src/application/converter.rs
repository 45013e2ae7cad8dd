//! Mapping from source messages to normalized posts.

use crate::domain::{ItemError, Post, RawMessage};

/// Converts one [`RawMessage`] into a [`Post`].
///
/// Media files are left empty; the media fetcher fills them in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostConverter;

impl PostConverter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Build a post from `raw`.
    ///
    /// # Errors
    /// Returns [`ItemError::Conversion`] when the message carries values a
    /// post cannot hold, such as a non-positive id or an out-of-range
    /// timestamp.
    pub fn convert(&self, raw: &RawMessage) -> Result<Post, ItemError> {
        if raw.id <= 0 {
            return Err(conversion(raw.id, format!("invalid message id {}", raw.id)));
        }
        let created_at = raw.date().ok_or_else(|| {
            conversion(raw.id, format!("unrepresentable timestamp {}", raw.timestamp))
        })?;

        let views = counter(raw.id, "view", raw.views.unwrap_or(0))?;
        let total_forwards = counter(raw.id, "forward", raw.forwards.unwrap_or(0))?;

        let mut reactions: u64 = 0;
        for reaction in &raw.reactions {
            let count = counter(raw.id, "reaction", reaction.count)?;
            reactions = reactions.saturating_add(count);
        }

        Ok(Post {
            id: raw.id,
            created_at,
            is_edited: raw.edit_date.is_some(),
            edited_at: raw.edit_date,
            views,
            reactions,
            total_forwards,
            // The source only exposes a total.
            public_forwards: 0,
            private_forwards: 0,
            content: raw.text.clone().unwrap_or_default(),
            ..Default::default()
        })
    }
}

fn counter(message_id: i64, what: &str, value: i64) -> Result<u64, ItemError> {
    u64::try_from(value).map_err(|_| conversion(message_id, format!("negative {what} count {value}")))
}

fn conversion(message_id: i64, reason: String) -> ItemError {
    ItemError::Conversion { message_id, reason }
}
