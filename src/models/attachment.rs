//! Represents a file attached to an item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Attachment metadata. The payload itself is loaded separately.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub id: i64,

    /// Owning item.
    pub item_id: i64,

    /// Original filename as sent by the client.
    pub filename: String,

    /// Declared MIME type.
    pub content_type: String,

    pub size_bytes: i64,

    pub created_at: DateTime<Utc>,
}

/// Attachment metadata together with its stored bytes.
#[derive(Clone, FromRow, Debug)]
pub struct AttachmentBlob {
    #[sqlx(flatten)]
    pub meta: Attachment,
    pub data: Vec<u8>,
}
