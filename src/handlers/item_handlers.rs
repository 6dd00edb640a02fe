//! HTTP handlers for the items of a bucket.
//!
//! Reads follow the bucket's visibility; writes require owning the bucket,
//! checked with a single owner-scoped lookup.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    Data, IdRef,
    extract::{JsonBody, PathParams, QueryParams, flag},
};
use crate::{
    auth::{AccessError, Authenticated, Principal, guard},
    errors::AppError,
    models::item::{Item, ItemPatch},
    services::todo_service::{ItemFilter, NewItem, TodoService},
    validation,
};

/// Query params accepted by `GET /buckets/{bucket_id}/items`.
#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub query: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub done: Option<bool>,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemReq {
    pub content: String,
    pub parent_id: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ItemList {
    pub data: Vec<Item>,
    pub total: i64,
}

/// GET `/buckets/{bucket_id}/items`: paginated, with the overall total.
pub async fn list_items(
    State(todos): State<TodoService>,
    principal: Principal,
    PathParams(bucket_id): PathParams<i64>,
    QueryParams(q): QueryParams<ListItemsQuery>,
) -> Result<Json<ItemList>, AppError> {
    if let Some(query) = &q.query {
        validation::search_query(query)?;
    }
    let page = validation::page(q.page, q.limit)?;
    let bucket = guard::readable_bucket(&todos, &principal, bucket_id).await?;

    let filter = ItemFilter {
        query: q.query,
        done: q.done,
        parent_id: q.parent_id,
        page,
    };
    let page = todos.list_items(bucket.id, &filter).await?;
    Ok(Json(ItemList {
        data: page.items,
        total: page.total,
    }))
}

/// POST `/buckets/{bucket_id}/items`: create an item, optionally under a
/// top-level parent in the same bucket.
pub async fn create_item(
    State(todos): State<TodoService>,
    caller: Authenticated,
    PathParams(bucket_id): PathParams<i64>,
    JsonBody(req): JsonBody<CreateItemReq>,
) -> Result<impl IntoResponse, AppError> {
    let bucket = guard::authorize_item_write(&todos, &Principal::from(caller), bucket_id).await?;
    validation::item_content(&req.content)?;
    if let Some(parent_id) = req.parent_id {
        guard::validate_nesting(&todos, parent_id, bucket.id).await?;
    }

    let item = todos
        .insert_item(
            bucket.id,
            &NewItem {
                content: req.content,
                parent_id: req.parent_id,
                deadline: req.deadline,
            },
        )
        .await?;
    info!(item_id = item.id, bucket_id = bucket.id, "created item");
    Ok((
        StatusCode::CREATED,
        Json(Data::new(IdRef { id: item.id })),
    ))
}

/// GET `/buckets/{bucket_id}/items/{item_id}`
pub async fn get_item(
    State(todos): State<TodoService>,
    principal: Principal,
    PathParams((bucket_id, item_id)): PathParams<(i64, i64)>,
) -> Result<Json<Data<Item>>, AppError> {
    let bucket = guard::readable_bucket(&todos, &principal, bucket_id).await?;
    let item = todos
        .find_item(item_id, bucket.id)
        .await?
        .ok_or(AccessError::NotFound("item"))?;
    Ok(Json(Data::new(item)))
}

/// PATCH `/buckets/{bucket_id}/items/{item_id}`: update content, done flag
/// or deadline.
pub async fn update_item(
    State(todos): State<TodoService>,
    caller: Authenticated,
    PathParams((bucket_id, item_id)): PathParams<(i64, i64)>,
    JsonBody(patch): JsonBody<ItemPatch>,
) -> Result<Json<Data<IdRef>>, AppError> {
    let bucket = guard::authorize_item_write(&todos, &Principal::from(caller), bucket_id).await?;
    if let Some(content) = &patch.content {
        validation::item_content(content)?;
    }

    let item = todos
        .update_item(item_id, bucket.id, &patch)
        .await?
        .ok_or(AccessError::NotFound("item"))?;
    Ok(Json(Data::new(IdRef { id: item.id })))
}

/// DELETE `/buckets/{bucket_id}/items/{item_id}`: sub-items and
/// attachments are removed with it.
pub async fn delete_item(
    State(todos): State<TodoService>,
    caller: Authenticated,
    PathParams((bucket_id, item_id)): PathParams<(i64, i64)>,
) -> Result<Json<Data<IdRef>>, AppError> {
    let bucket = guard::authorize_item_write(&todos, &Principal::from(caller), bucket_id).await?;
    if !todos.delete_item(item_id, bucket.id).await? {
        return Err(AccessError::NotFound("item").into());
    }
    info!(item_id, bucket_id, "deleted item");
    Ok(Json(Data::new(IdRef { id: item_id })))
}
