//! Represents a to-do item stored in a bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single unit of work inside a bucket.
///
/// Items nest at most one level: an item whose `parent_id` is set must point
/// at a top-level item of the same bucket.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Item {
    /// Row id.
    pub id: i64,

    /// Foreign key linking to the parent bucket.
    pub bucket_id: i64,

    /// Parent item in the same bucket, if this item is a sub-task.
    pub parent_id: Option<i64>,

    /// Free-text content.
    pub content: String,

    /// Completion flag.
    pub done: bool,

    /// Optional due date.
    pub deadline: Option<DateTime<Utc>>,

    /// When this item was created.
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Partial update of an item. Absent fields are left untouched.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ItemPatch {
    pub content: Option<String>,
    pub done: Option<bool>,
    pub deadline: Option<DateTime<Utc>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.done.is_none() && self.deadline.is_none()
    }
}
