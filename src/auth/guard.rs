//! Ownership and visibility checks for buckets and the items inside them.
//!
//! Reads and writes are deliberately asymmetric:
//!
//! - A bucket read by someone who may not see it is reported as
//!   [`AccessError::NotFound`], never as forbidden, so private buckets do not
//!   leak their existence.
//! - A bucket write by a non-owner who *can* see the bucket (it is public) is
//!   [`AccessError::Forbidden`]; if they cannot see it, it is `NotFound`.
//! - Item writes look the bucket up scoped to the caller as owner in one
//!   step. A miss is `NotFound` whether the bucket is absent or foreign.
//!
//! Anonymous callers asking to write get [`AccessError::Unauthorized`] before
//! anything is looked up.

use std::future::Future;

use tracing::debug;

use super::{
    error::{AccessError, AccessResult},
    identity::Principal,
};
use crate::{
    models::{bucket::Bucket, item::Item},
    services::StoreResult,
};

/// Lookups the guard needs from the backing store.
pub trait AccessStore {
    fn find_bucket(&self, bucket_id: i64)
    -> impl Future<Output = StoreResult<Option<Bucket>>> + Send;

    /// Matches only when the bucket exists *and* is owned by `owner_id`.
    fn find_bucket_scoped(
        &self,
        bucket_id: i64,
        owner_id: i64,
    ) -> impl Future<Output = StoreResult<Option<Bucket>>> + Send;

    /// Matches only when the item exists inside `bucket_id`.
    fn find_item(
        &self,
        item_id: i64,
        bucket_id: i64,
    ) -> impl Future<Output = StoreResult<Option<Item>>> + Send;
}

/// Gate for endpoints that need a signed-in user.
pub fn require_authenticated(principal: &Principal) -> AccessResult<i64> {
    principal.user_id().ok_or(AccessError::Unauthorized)
}

/// Public buckets are readable by everyone; private ones by their owner.
pub fn authorize_bucket_read(principal: &Principal, bucket: &Bucket) -> AccessResult<()> {
    if bucket.is_public() || principal.user_id() == Some(bucket.owner_id) {
        Ok(())
    } else {
        Err(AccessError::NotFound("bucket"))
    }
}

/// Only the owner may change a bucket.
pub fn authorize_bucket_write(principal: &Principal, bucket: &Bucket) -> AccessResult<()> {
    let user_id = require_authenticated(principal)?;
    authorize_bucket_read(principal, bucket)?;
    if user_id == bucket.owner_id {
        Ok(())
    } else {
        Err(AccessError::Forbidden)
    }
}

/// Load a bucket for reading, hiding it when the caller may not see it.
pub async fn readable_bucket<S>(
    store: &S,
    principal: &Principal,
    bucket_id: i64,
) -> AccessResult<Bucket>
where
    S: AccessStore + Sync,
{
    let bucket = store
        .find_bucket(bucket_id)
        .await?
        .ok_or(AccessError::NotFound("bucket"))?;
    authorize_bucket_read(principal, &bucket)?;
    Ok(bucket)
}

/// Load a bucket for update or delete.
pub async fn writable_bucket<S>(
    store: &S,
    principal: &Principal,
    bucket_id: i64,
) -> AccessResult<Bucket>
where
    S: AccessStore + Sync,
{
    require_authenticated(principal)?;
    let bucket = store
        .find_bucket(bucket_id)
        .await?
        .ok_or(AccessError::NotFound("bucket"))?;
    authorize_bucket_write(principal, &bucket).inspect_err(|err| {
        debug!(bucket_id, ?principal, %err, "bucket write denied");
    })?;
    Ok(bucket)
}

/// Authorize a change to the items of `bucket_id` and return the bucket.
pub async fn authorize_item_write<S>(
    store: &S,
    principal: &Principal,
    bucket_id: i64,
) -> AccessResult<Bucket>
where
    S: AccessStore + Sync,
{
    let user_id = require_authenticated(principal)?;
    store
        .find_bucket_scoped(bucket_id, user_id)
        .await?
        .ok_or(AccessError::NotFound("bucket"))
}

/// Check that a new item may hang under `parent_id` in `bucket_id`.
///
/// The parent must live in the same bucket and must itself be top-level.
pub async fn validate_nesting<S>(store: &S, parent_id: i64, bucket_id: i64) -> AccessResult<()>
where
    S: AccessStore + Sync,
{
    let parent = store
        .find_item(parent_id, bucket_id)
        .await?
        .ok_or(AccessError::NotFound("parent item"))?;
    if parent.is_top_level() {
        Ok(())
    } else {
        Err(AccessError::nesting_too_deep())
    }
}
