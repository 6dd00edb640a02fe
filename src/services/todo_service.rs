//! TodoService: buckets, items and attachments backed by SQLite.
//!
//! Every method is a single statement, so each call is atomic on its own.
//! Authorization happens before these methods are called; see
//! [`crate::auth::guard`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use tracing::{debug, warn};

use super::{Page, StoreError, StoreResult, contains_pattern, is_unique_violation};
use crate::{
    auth::guard::AccessStore,
    models::{
        attachment::{Attachment, AttachmentBlob},
        bucket::{Bucket, BucketPatch, Visibility},
        item::{Item, ItemPatch},
    },
};

const BUCKET_COLUMNS: &str = "id, owner_id, title, visibility, created_at";
const ITEM_COLUMNS: &str = "id, bucket_id, parent_id, content, done, deadline, created_at";
const ATTACHMENT_COLUMNS: &str = "id, item_id, filename, content_type, size_bytes, created_at";

/// Filters for listing a user's buckets.
#[derive(Clone, Debug, Default)]
pub struct BucketFilter {
    /// Substring of the title.
    pub query: Option<String>,
    pub visibility: Option<Visibility>,
    pub page: Page,
}

/// Filters for listing the items of a bucket.
#[derive(Clone, Debug, Default)]
pub struct ItemFilter {
    /// Substring of the content.
    pub query: Option<String>,
    pub done: Option<bool>,
    /// Only the children of this item.
    pub parent_id: Option<i64>,
    pub page: Page,
}

/// A page of items plus the number of items matching the filter overall.
#[derive(Debug)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub total: i64,
}

#[derive(Clone, Debug)]
pub struct NewItem {
    pub content: String,
    pub parent_id: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct NewAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct TodoService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl TodoService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn find_bucket(&self, bucket_id: i64) -> StoreResult<Option<Bucket>> {
        let bucket = sqlx::query_as::<_, Bucket>(&format!(
            "SELECT {BUCKET_COLUMNS} FROM buckets WHERE id = ?"
        ))
        .bind(bucket_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(bucket)
    }

    pub async fn find_bucket_scoped(
        &self,
        bucket_id: i64,
        owner_id: i64,
    ) -> StoreResult<Option<Bucket>> {
        let bucket = sqlx::query_as::<_, Bucket>(&format!(
            "SELECT {BUCKET_COLUMNS} FROM buckets WHERE id = ? AND owner_id = ?"
        ))
        .bind(bucket_id)
        .bind(owner_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(bucket)
    }

    /// Look up one of `owner_id`'s buckets by exact title.
    pub async fn find_bucket_by_title(
        &self,
        owner_id: i64,
        title: &str,
    ) -> StoreResult<Option<Bucket>> {
        let bucket = sqlx::query_as::<_, Bucket>(&format!(
            "SELECT {BUCKET_COLUMNS} FROM buckets WHERE owner_id = ? AND title = ?"
        ))
        .bind(owner_id)
        .bind(title)
        .fetch_optional(&*self.db)
        .await?;
        Ok(bucket)
    }

    /// List the buckets owned by `owner_id`, oldest first.
    pub async fn list_buckets(
        &self,
        owner_id: i64,
        filter: &BucketFilter,
    ) -> StoreResult<Vec<Bucket>> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {BUCKET_COLUMNS} FROM buckets WHERE owner_id = "));
        builder.push_bind(owner_id);

        if let Some(query) = &filter.query {
            builder.push(" AND title LIKE ");
            builder.push_bind(contains_pattern(query));
            builder.push(" ESCAPE '\\'");
        }
        if let Some(visibility) = filter.visibility {
            builder.push(" AND visibility = ");
            builder.push_bind(visibility);
        }

        builder.push(" ORDER BY id ASC LIMIT ");
        builder.push_bind(i64::from(filter.page.limit));
        builder.push(" OFFSET ");
        builder.push_bind(filter.page.offset());

        Ok(builder.build_query_as().fetch_all(&*self.db).await?)
    }

    /// Insert a bucket. Title uniqueness per owner is checked by the caller;
    /// a concurrent insert that slips past that check fails here.
    pub async fn insert_bucket(
        &self,
        owner_id: i64,
        title: &str,
        visibility: Visibility,
    ) -> StoreResult<Bucket> {
        sqlx::query_as::<_, Bucket>(&format!(
            "INSERT INTO buckets (owner_id, title, visibility, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING {BUCKET_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(title)
        .bind(visibility)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                warn!(owner_id, title, "concurrent insert of duplicate bucket title");
            }
            StoreError::Sqlx(err)
        })
    }

    /// Apply `patch` to a bucket. Returns `None` if the bucket is gone.
    pub async fn update_bucket(
        &self,
        bucket_id: i64,
        patch: &BucketPatch,
    ) -> StoreResult<Option<Bucket>> {
        if patch.is_empty() {
            return self.find_bucket(bucket_id).await;
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE buckets SET ");
        let mut set = builder.separated(", ");
        if let Some(title) = &patch.title {
            set.push("title = ");
            set.push_bind_unseparated(title);
        }
        if let Some(visibility) = patch.visibility {
            set.push("visibility = ");
            set.push_bind_unseparated(visibility);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(bucket_id);
        builder.push(format!(" RETURNING {BUCKET_COLUMNS}"));

        Ok(builder.build_query_as().fetch_optional(&*self.db).await?)
    }

    /// Hard-delete a bucket along with its items and their attachments.
    pub async fn delete_bucket(&self, bucket_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM buckets WHERE id = ?")
            .bind(bucket_id)
            .execute(&*self.db)
            .await?;
        debug!(bucket_id, rows = result.rows_affected(), "deleted bucket");
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_item(&self, item_id: i64, bucket_id: i64) -> StoreResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ? AND bucket_id = ?"
        ))
        .bind(item_id)
        .bind(bucket_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(item)
    }

    /// List items of a bucket with the total count for the same filter.
    pub async fn list_items(&self, bucket_id: i64, filter: &ItemFilter) -> StoreResult<ItemPage> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {ITEM_COLUMNS} FROM items"));
        push_item_filters(&mut builder, bucket_id, filter);
        builder.push(" ORDER BY id ASC LIMIT ");
        builder.push_bind(i64::from(filter.page.limit));
        builder.push(" OFFSET ");
        builder.push_bind(filter.page.offset());
        let items: Vec<Item> = builder.build_query_as().fetch_all(&*self.db).await?;

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM items");
        push_item_filters(&mut builder, bucket_id, filter);
        let total: i64 = builder.build_query_scalar().fetch_one(&*self.db).await?;

        Ok(ItemPage { items, total })
    }

    /// Insert an item. Nesting rules are enforced by the caller.
    pub async fn insert_item(&self, bucket_id: i64, item: &NewItem) -> StoreResult<Item> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "INSERT INTO items (bucket_id, parent_id, content, done, deadline, created_at)
             VALUES (?, ?, ?, 0, ?, ?)
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(bucket_id)
        .bind(item.parent_id)
        .bind(&item.content)
        .bind(item.deadline)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        Ok(item)
    }

    /// Apply `patch` to an item of `bucket_id`. Returns `None` if it is gone.
    pub async fn update_item(
        &self,
        item_id: i64,
        bucket_id: i64,
        patch: &ItemPatch,
    ) -> StoreResult<Option<Item>> {
        if patch.is_empty() {
            return self.find_item(item_id, bucket_id).await;
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE items SET ");
        let mut set = builder.separated(", ");
        if let Some(content) = &patch.content {
            set.push("content = ");
            set.push_bind_unseparated(content);
        }
        if let Some(done) = patch.done {
            set.push("done = ");
            set.push_bind_unseparated(done);
        }
        if let Some(deadline) = patch.deadline {
            set.push("deadline = ");
            set.push_bind_unseparated(deadline);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(item_id);
        builder.push(" AND bucket_id = ");
        builder.push_bind(bucket_id);
        builder.push(format!(" RETURNING {ITEM_COLUMNS}"));

        Ok(builder.build_query_as().fetch_optional(&*self.db).await?)
    }

    /// Hard-delete an item; its sub-items and attachments go with it.
    pub async fn delete_item(&self, item_id: i64, bucket_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ? AND bucket_id = ?")
            .bind(item_id)
            .bind(bucket_id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_attachments(&self, item_id: i64) -> StoreResult<Vec<Attachment>> {
        let attachments = sqlx::query_as::<_, Attachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE item_id = ? ORDER BY id ASC"
        ))
        .bind(item_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(attachments)
    }

    pub async fn insert_attachment(
        &self,
        item_id: i64,
        attachment: &NewAttachment,
    ) -> StoreResult<Attachment> {
        let size_bytes = attachment.data.len() as i64;
        let inserted = sqlx::query_as::<_, Attachment>(&format!(
            "INSERT INTO attachments (item_id, filename, content_type, size_bytes, data, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {ATTACHMENT_COLUMNS}"
        ))
        .bind(item_id)
        .bind(&attachment.filename)
        .bind(&attachment.content_type)
        .bind(size_bytes)
        .bind(&attachment.data)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        debug!(item_id, attachment_id = inserted.id, size_bytes, "stored attachment");
        Ok(inserted)
    }

    /// Fetch an attachment of `item_id` including its payload.
    pub async fn find_attachment(
        &self,
        attachment_id: i64,
        item_id: i64,
    ) -> StoreResult<Option<AttachmentBlob>> {
        let blob = sqlx::query_as::<_, AttachmentBlob>(&format!(
            "SELECT {ATTACHMENT_COLUMNS}, data FROM attachments WHERE id = ? AND item_id = ?"
        ))
        .bind(attachment_id)
        .bind(item_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(blob)
    }

    pub async fn delete_attachment(&self, attachment_id: i64, item_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = ? AND item_id = ?")
            .bind(attachment_id)
            .bind(item_id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl AccessStore for TodoService {
    async fn find_bucket(&self, bucket_id: i64) -> StoreResult<Option<Bucket>> {
        TodoService::find_bucket(self, bucket_id).await
    }

    async fn find_bucket_scoped(
        &self,
        bucket_id: i64,
        owner_id: i64,
    ) -> StoreResult<Option<Bucket>> {
        TodoService::find_bucket_scoped(self, bucket_id, owner_id).await
    }

    async fn find_item(&self, item_id: i64, bucket_id: i64) -> StoreResult<Option<Item>> {
        TodoService::find_item(self, item_id, bucket_id).await
    }
}

fn push_item_filters(builder: &mut QueryBuilder<'_, Sqlite>, bucket_id: i64, filter: &ItemFilter) {
    builder.push(" WHERE bucket_id = ");
    builder.push_bind(bucket_id);
    if let Some(query) = &filter.query {
        builder.push(" AND content LIKE ");
        builder.push_bind(contains_pattern(query));
        builder.push(" ESCAPE '\\'");
    }
    if let Some(done) = filter.done {
        builder.push(" AND done = ");
        builder.push_bind(done);
    }
    if let Some(parent_id) = filter.parent_id {
        builder.push(" AND parent_id = ");
        builder.push_bind(parent_id);
    }
}
