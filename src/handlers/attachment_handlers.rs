//! HTTP handlers for files attached to items.
//! Payloads live in SQLite next to their metadata and are served whole.

use axum::{
    Json,
    body::Body,
    extract::{Multipart, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use bytes::Bytes;
use tracing::info;

use super::{Data, IdRef, extract::PathParams};
use crate::{
    auth::{AccessError, Authenticated, Principal, guard},
    errors::AppError,
    models::{attachment::Attachment, bucket::Bucket, item::Item},
    services::todo_service::{NewAttachment, TodoService},
    validation,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const DEFAULT_FILENAME: &str = "attachment";

/// GET `/buckets/{bucket_id}/items/{item_id}/attachments`
pub async fn list_attachments(
    State(todos): State<TodoService>,
    principal: Principal,
    PathParams((bucket_id, item_id)): PathParams<(i64, i64)>,
) -> Result<Json<Data<Vec<Attachment>>>, AppError> {
    let bucket = guard::readable_bucket(&todos, &principal, bucket_id).await?;
    let item = existing_item(&todos, &bucket, item_id).await?;
    let attachments = todos.list_attachments(item.id).await?;
    Ok(Json(Data::new(attachments)))
}

/// POST `/buckets/{bucket_id}/items/{item_id}/attachments`: multipart with
/// a single `file` field.
pub async fn upload_attachment(
    State(todos): State<TodoService>,
    caller: Authenticated,
    PathParams((bucket_id, item_id)): PathParams<(i64, i64)>,
    WithRejection(mut multipart, _): WithRejection<Multipart, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let bucket = guard::authorize_item_write(&todos, &Principal::from(caller), bucket_id).await?;
    let item = existing_item(&todos, &bucket, item_id).await?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .unwrap_or(DEFAULT_FILENAME)
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let data = field.bytes().await?;
                validation::upload_size(data.len())?;
                upload = Some(NewAttachment {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            other => {
                return Err(AccessError::invalid(format!("unexpected field `{other}`")).into());
            }
        }
    }
    let upload = upload.ok_or_else(|| AccessError::invalid("missing `file` field"))?;

    let attachment = todos.insert_attachment(item.id, &upload).await?;
    info!(
        attachment_id = attachment.id,
        item_id = item.id,
        size_bytes = attachment.size_bytes,
        "uploaded attachment"
    );
    Ok((StatusCode::CREATED, Json(Data::new(attachment))))
}

/// GET `/buckets/{bucket_id}/items/{item_id}/attachments/{attachment_id}`
pub async fn download_attachment(
    State(todos): State<TodoService>,
    principal: Principal,
    PathParams((bucket_id, item_id, attachment_id)): PathParams<(i64, i64, i64)>,
) -> Result<Response, AppError> {
    let bucket = guard::readable_bucket(&todos, &principal, bucket_id).await?;
    let item = existing_item(&todos, &bucket, item_id).await?;
    let blob = todos
        .find_attachment(attachment_id, item.id)
        .await?
        .ok_or(AccessError::NotFound("attachment"))?;

    let mut response = Response::new(Body::from(Bytes::from(blob.data)));
    *response.status_mut() = StatusCode::OK;
    set_attachment_headers(response.headers_mut(), &blob.meta);
    Ok(response)
}

/// DELETE `/buckets/{bucket_id}/items/{item_id}/attachments/{attachment_id}`
pub async fn delete_attachment(
    State(todos): State<TodoService>,
    caller: Authenticated,
    PathParams((bucket_id, item_id, attachment_id)): PathParams<(i64, i64, i64)>,
) -> Result<Json<Data<IdRef>>, AppError> {
    let bucket = guard::authorize_item_write(&todos, &Principal::from(caller), bucket_id).await?;
    let item = existing_item(&todos, &bucket, item_id).await?;
    if !todos.delete_attachment(attachment_id, item.id).await? {
        return Err(AccessError::NotFound("attachment").into());
    }
    info!(attachment_id, item_id, "deleted attachment");
    Ok(Json(Data::new(IdRef { id: attachment_id })))
}

async fn existing_item(todos: &TodoService, bucket: &Bucket, item_id: i64) -> Result<Item, AppError> {
    let item = todos
        .find_item(item_id, bucket.id)
        .await?
        .ok_or(AccessError::NotFound("item"))?;
    Ok(item)
}

fn set_attachment_headers(headers: &mut HeaderMap, meta: &Attachment) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&meta.size_bytes.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );

    // Quotes and control characters cannot appear inside the quoted filename.
    let filename: String = meta
        .filename
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    let disposition = format!("attachment; filename=\"{filename}\"");
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
}
