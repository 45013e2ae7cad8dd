//! `SQLite` channel dump reader.
//!
//! Serves channel history from an offline dump with the tables `channels`,
//! `messages`, `attachments` and `blobs`, one page at a time.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::domain::{
    AppError, Attachment, ChannelHandle, MediaRef, RawMessage, Reaction, Result,
};

use super::channel_source::ChannelSource;

/// Tables a usable dump must contain.
const REQUIRED_TABLES: &[&str] = &["channels", "messages", "attachments", "blobs"];

/// Message row before timestamps and reactions are decoded.
#[derive(Debug)]
struct MessageRow {
    id: i64,
    date: i64,
    edit_date: Option<i64>,
    text: Option<String>,
    views: Option<i64>,
    forwards: Option<i64>,
    reactions: Option<String>,
}

/// Channel source backed by a read-only `SQLite` dump.
pub struct SqliteChannelSource {
    conn: Mutex<Connection>,
}

impl SqliteChannelSource {
    /// Opens a dump database in read-only mode.
    ///
    /// # Errors
    /// Returns error if database cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AppError::Config {
                message: format!("Channel dump not found: {}", path.display()),
            });
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(AppError::database)?;

        conn.execute_batch(
            "PRAGMA query_only = ON;
             PRAGMA temp_store = MEMORY;",
        )
        .map_err(AppError::database)?;

        tracing::debug!("Opened channel dump: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().map_err(|_| AppError::Transport {
            message: "channel dump connection lock poisoned".into(),
            source: None,
        })?;
        f(&conn)
    }

    fn missing_tables(conn: &Connection) -> Result<Vec<&'static str>> {
        let mut stmt = conn
            .prepare("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .map_err(AppError::database)?;

        let mut missing = Vec::new();
        for table in REQUIRED_TABLES {
            let count: i64 = stmt
                .query_row([table], |row| row.get(0))
                .map_err(AppError::database)?;
            if count == 0 {
                missing.push(*table);
            }
        }
        Ok(missing)
    }

    fn lookup_channel(conn: &Connection, identifier: &str) -> Result<Option<ChannelHandle>> {
        let identifier = identifier.trim();

        if let Ok(id) = identifier.parse::<i64>() {
            let by_id = conn
                .query_row(
                    "SELECT id, COALESCE(title, '') FROM channels WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(ChannelHandle {
                            id: row.get(0)?,
                            title: row.get(1)?,
                        })
                    },
                )
                .optional()
                .map_err(|e| AppError::transport("Failed to look up channel", e))?;
            if by_id.is_some() {
                return Ok(by_id);
            }
        }

        let mut stmt = conn
            .prepare("SELECT id, COALESCE(username, ''), COALESCE(title, '') FROM channels ORDER BY id")
            .map_err(|e| AppError::transport("Failed to list channels", e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| AppError::transport("Failed to list channels", e))?;

        let mut channels = Vec::new();
        for row in rows {
            match row {
                Ok(channel) => channels.push(channel),
                Err(e) => tracing::warn!("Failed to read channel row: {}", e),
            }
        }

        let wanted = identifier.trim_start_matches('@').to_lowercase();
        let by_username = channels
            .iter()
            .find(|(_, username, _)| username.trim_start_matches('@').to_lowercase() == wanted);
        let found = by_username.or_else(|| {
            channels
                .iter()
                .find(|(_, _, title)| title.to_lowercase().contains(&wanted))
        });

        Ok(found.map(|(id, _, title)| ChannelHandle {
            id: *id,
            title: title.clone(),
        }))
    }

    fn query_page(
        conn: &Connection,
        channel_id: i64,
        before: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<RawMessage>> {
        let limit = i64::try_from(page_size).unwrap_or(i64::MAX);

        let mut stmt = conn
            .prepare(
                r"
            SELECT id, date, edit_date, text, views, forwards, reactions
            FROM messages
            WHERE channel_id = ?1 AND (?2 IS NULL OR id < ?2)
            ORDER BY id DESC
            LIMIT ?3
            ",
            )
            .map_err(|e| AppError::transport("Failed to prepare page query", e))?;

        let rows = stmt
            .query_map(params![channel_id, before, limit], |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    edit_date: row.get(2)?,
                    text: row.get(3)?,
                    views: row.get(4)?,
                    forwards: row.get(5)?,
                    reactions: row.get(6)?,
                })
            })
            .map_err(|e| AppError::transport("Failed to fetch page", e))?;

        let mut messages = Vec::new();
        for row in rows {
            let row = row.map_err(|e| AppError::transport("Failed to read message row", e))?;

            let edit_date = row.edit_date.and_then(|secs| {
                let decoded = DateTime::<Utc>::from_timestamp(secs, 0);
                if decoded.is_none() {
                    tracing::warn!(id = row.id, edit_date = secs, "Ignoring invalid edit date");
                }
                decoded
            });
            let attachments = Self::query_attachments(conn, channel_id, row.id)?;

            messages.push(RawMessage {
                id: row.id,
                timestamp: row.date,
                edit_date,
                text: row.text,
                views: row.views,
                forwards: row.forwards,
                reactions: parse_reactions(row.id, row.reactions.as_deref()),
                attachments,
            });
        }

        tracing::debug!(
            channel = channel_id,
            before = ?before,
            count = messages.len(),
            "Fetched page from channel dump"
        );

        Ok(messages)
    }

    fn query_attachments(
        conn: &Connection,
        channel_id: i64,
        message_id: i64,
    ) -> Result<Vec<Attachment>> {
        let mut stmt = conn
            .prepare_cached(
                r"
            SELECT kind, COALESCE(media_ref, ''), file_name, mime_type
            FROM attachments
            WHERE channel_id = ?1 AND message_id = ?2
            ORDER BY position ASC
            ",
            )
            .map_err(|e| AppError::transport("Failed to prepare attachment query", e))?;

        let rows = stmt
            .query_map(params![channel_id, message_id], |row| {
                let kind: String = row.get(0)?;
                let media_ref = MediaRef(row.get(1)?);
                let file_name: Option<String> = row.get(2)?;
                let mime_type: Option<String> = row.get(3)?;

                Ok(match kind.as_str() {
                    "photo" => Attachment::Photo { media_ref },
                    "document" => Attachment::Document {
                        media_ref,
                        file_name,
                        mime_type,
                    },
                    _ => Attachment::Unsupported { kind },
                })
            })
            .map_err(|e| AppError::transport("Failed to fetch attachments", e))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::transport("Failed to read attachment row", e))
    }

    fn query_blob(conn: &Connection, media: &MediaRef) -> Result<Vec<u8>> {
        conn.query_row(
            "SELECT data FROM blobs WHERE media_ref = ?1",
            [&media.0],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()
        .map_err(|e| AppError::transport(format!("Failed to read blob {media}"), e))?
        .ok_or_else(|| AppError::Transport {
            message: format!("Blob not found: {media}"),
            source: None,
        })
    }
}

/// Decode the JSON reaction column. Bad JSON is logged and treated as none.
fn parse_reactions(message_id: i64, raw: Option<&str>) -> Vec<Reaction> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str(raw) {
        Ok(reactions) => reactions,
        Err(e) => {
            tracing::warn!(id = message_id, "Ignoring malformed reactions: {}", e);
            Vec::new()
        }
    }
}

#[async_trait]
impl ChannelSource for SqliteChannelSource {
    async fn authenticate(&self) -> Result<bool> {
        let missing = self.with_conn(Self::missing_tables)?;
        if missing.is_empty() {
            Ok(true)
        } else {
            tracing::warn!(missing = ?missing, "Channel dump is missing required tables");
            Ok(false)
        }
    }

    async fn resolve_channel(&self, identifier: &str) -> Result<Option<ChannelHandle>> {
        self.with_conn(|conn| Self::lookup_channel(conn, identifier))
    }

    async fn fetch_page(
        &self,
        handle: &ChannelHandle,
        before: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<RawMessage>> {
        self.with_conn(|conn| Self::query_page(conn, handle.id, before, page_size))
    }

    async fn download_blob(&self, media: &MediaRef) -> Result<Vec<u8>> {
        self.with_conn(|conn| Self::query_blob(conn, media))
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
