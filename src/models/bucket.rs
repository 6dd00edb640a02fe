//! Represents a bucket: a named, owned list of to-do items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Who may read a bucket besides its owner.
#[derive(Serialize, Deserialize, sqlx::Type, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Visibility {
    /// Readable by anyone, including anonymous callers.
    Public,
    /// Readable by the owner only.
    #[default]
    Private,
}

/// A to-do bucket.
///
/// Every bucket belongs to exactly one user. Titles are unique per owner,
/// so two users may both have a bucket called "Groceries".
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Bucket {
    /// Row id.
    pub id: i64,

    /// ID of the user that owns this bucket.
    pub owner_id: i64,

    /// Title, unique within the owner's buckets.
    pub title: String,

    /// Public or private.
    pub visibility: Visibility,

    /// When this bucket was created.
    pub created_at: DateTime<Utc>,
}

impl Bucket {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// Partial update of a bucket. Absent fields are left untouched.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct BucketPatch {
    pub title: Option<String>,
    pub visibility: Option<Visibility>,
}

impl BucketPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.visibility.is_none()
    }
}
