//! HTTP handlers for bucket operations.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::info;

use super::{
    Data, IdRef,
    extract::{JsonBody, PathParams, QueryParams},
};
use crate::{
    auth::{AccessError, Authenticated, Principal, guard},
    errors::AppError,
    models::bucket::{Bucket, BucketPatch, Visibility},
    services::{
        StoreError, is_foreign_key_violation,
        todo_service::{BucketFilter, TodoService},
    },
    validation,
};

/// Query params accepted by `GET /buckets`.
#[derive(Debug, Deserialize)]
pub struct ListBucketsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub query: Option<String>,
    pub visibility: Option<Visibility>,
}

/// Request body for `POST /buckets`.
#[derive(Debug, Deserialize)]
pub struct CreateBucketReq {
    pub title: String,
    #[serde(default)]
    pub visibility: Visibility,
}

/// GET `/buckets`: the caller's own buckets.
pub async fn list_buckets(
    State(todos): State<TodoService>,
    Authenticated(user_id): Authenticated,
    QueryParams(q): QueryParams<ListBucketsQuery>,
) -> Result<Json<Data<Vec<Bucket>>>, AppError> {
    if let Some(query) = &q.query {
        validation::search_query(query)?;
    }
    let filter = BucketFilter {
        query: q.query,
        visibility: q.visibility,
        page: validation::page(q.page, q.limit)?,
    };

    let buckets = todos.list_buckets(user_id, &filter).await?;
    Ok(Json(Data::new(buckets)))
}

/// POST `/buckets`: create a bucket. Titles are unique per owner.
pub async fn create_bucket(
    State(todos): State<TodoService>,
    Authenticated(user_id): Authenticated,
    JsonBody(req): JsonBody<CreateBucketReq>,
) -> Result<impl IntoResponse, AppError> {
    validation::bucket_title(&req.title)?;
    if todos
        .find_bucket_by_title(user_id, &req.title)
        .await?
        .is_some()
    {
        return Err(AccessError::invalid("bucket already exists").into());
    }

    let bucket = match todos.insert_bucket(user_id, &req.title, req.visibility).await {
        Ok(bucket) => bucket,
        // The token outlived its account.
        Err(StoreError::Sqlx(err)) if is_foreign_key_violation(&err) => {
            return Err(AccessError::Unauthorized.into());
        }
        Err(err) => return Err(err.into()),
    };
    info!(bucket_id = bucket.id, owner_id = user_id, "created bucket");
    Ok((StatusCode::CREATED, Json(Data::new(IdRef { id: bucket.id }))))
}

/// GET `/buckets/{bucket_id}`: public buckets are visible to anyone.
pub async fn get_bucket(
    State(todos): State<TodoService>,
    principal: Principal,
    PathParams(bucket_id): PathParams<i64>,
) -> Result<Json<Data<Bucket>>, AppError> {
    let bucket = guard::readable_bucket(&todos, &principal, bucket_id).await?;
    Ok(Json(Data::new(bucket)))
}

/// PATCH `/buckets/{bucket_id}`: owner only.
pub async fn update_bucket(
    State(todos): State<TodoService>,
    caller: Authenticated,
    PathParams(bucket_id): PathParams<i64>,
    JsonBody(patch): JsonBody<BucketPatch>,
) -> Result<Json<Data<IdRef>>, AppError> {
    let bucket = guard::writable_bucket(&todos, &Principal::from(caller), bucket_id).await?;

    if let Some(title) = &patch.title {
        validation::bucket_title(title)?;
        if let Some(existing) = todos.find_bucket_by_title(bucket.owner_id, title).await? {
            if existing.id != bucket.id {
                return Err(AccessError::invalid("bucket already exists").into());
            }
        }
    }

    todos
        .update_bucket(bucket.id, &patch)
        .await?
        .ok_or(AccessError::NotFound("bucket"))?;
    Ok(Json(Data::new(IdRef { id: bucket.id })))
}

/// DELETE `/buckets/{bucket_id}`: owner only; removes its items too.
pub async fn delete_bucket(
    State(todos): State<TodoService>,
    caller: Authenticated,
    PathParams(bucket_id): PathParams<i64>,
) -> Result<Json<Data<IdRef>>, AppError> {
    let bucket = guard::writable_bucket(&todos, &Principal::from(caller), bucket_id).await?;
    if !todos.delete_bucket(bucket.id).await? {
        return Err(AccessError::NotFound("bucket").into());
    }
    info!(bucket_id, "deleted bucket");
    Ok(Json(Data::new(IdRef { id: bucket.id })))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{TestApp, request};

    #[tokio::test]
    async fn owner_creates_and_reads_bucket() {
        let app = TestApp::new().await;
        let (_, token) = app.user("alice").await;

        let (status, body) = app
            .send(request(Method::POST, "/buckets", Some(&token), json!({"title": "Groceries"})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = app
            .send(request(Method::GET, &format!("/buckets/{id}"), Some(&token), json!(null)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Groceries");
        assert_eq!(body["data"]["visibility"], "private");
    }

    #[tokio::test]
    async fn duplicate_title_is_scoped_to_owner() {
        let app = TestApp::new().await;
        let (_, alice) = app.user("alice").await;
        let (_, bob) = app.user("bob").await;
        let body = json!({"title": "Groceries"});

        let (status, _) = app
            .send(request(Method::POST, "/buckets", Some(&alice), body.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body_json) = app
            .send(request(Method::POST, "/buckets", Some(&alice), body.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body_json["error"], "bucket already exists");

        let (status, _) = app
            .send(request(Method::POST, "/buckets", Some(&bob), body))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn private_bucket_reads_as_missing_for_others() {
        let app = TestApp::new().await;
        let (alice_id, _) = app.user("alice").await;
        let (_, bob) = app.user("bob").await;
        let private = app.bucket(alice_id, "Diary", false).await;
        let public = app.bucket(alice_id, "Recipes", true).await;

        let uri = format!("/buckets/{}", private.id);
        let (status, body) = app.send(request(Method::GET, &uri, Some(&bob), json!(null))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (missing_status, missing_body) = app
            .send(request(Method::GET, "/buckets/9999", Some(&bob), json!(null)))
            .await;
        assert_eq!(missing_status, status);
        assert_eq!(missing_body, body);

        let (status, _) = app.send(request(Method::GET, &uri, None, json!(null))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/buckets/{}", public.id);
        let (status, _) = app.send(request(Method::GET, &uri, None, json!(null))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.send(request(Method::GET, &uri, Some(&bob), json!(null))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn bucket_writes_follow_ownership() {
        let app = TestApp::new().await;
        let (alice_id, alice) = app.user("alice").await;
        let (_, bob) = app.user("bob").await;
        let private = app.bucket(alice_id, "Diary", false).await;
        let public = app.bucket(alice_id, "Recipes", true).await;
        let patch = json!({"title": "Renamed"});

        let uri = format!("/buckets/{}", public.id);
        let (status, _) = app
            .send(request(Method::PATCH, &uri, Some(&bob), patch.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.send(request(Method::DELETE, &uri, Some(&bob), json!(null))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/buckets/{}", private.id);
        let (status, _) = app
            .send(request(Method::PATCH, &uri, Some(&bob), patch.clone()))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        for uri in [format!("/buckets/{}", private.id), "/buckets/9999".to_string()] {
            let (status, _) = app
                .send(request(Method::PATCH, &uri, None, patch.clone()))
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let (status, _) = app
            .send(request(Method::PATCH, &uri, Some(&alice), patch))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = app.send(request(Method::GET, &uri, Some(&alice), json!(null))).await;
        assert_eq!(body["data"]["title"], "Renamed");
        assert_eq!(body["data"]["visibility"], "private");

        let (status, _) = app.send(request(Method::DELETE, &uri, Some(&alice), json!(null))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.send(request(Method::GET, &uri, Some(&alice), json!(null))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rename_onto_existing_title_is_rejected() {
        let app = TestApp::new().await;
        let (alice_id, alice) = app.user("alice").await;
        app.bucket(alice_id, "Home", false).await;
        let work = app.bucket(alice_id, "Work", false).await;

        let uri = format!("/buckets/{}", work.id);
        let (status, _) = app
            .send(request(Method::PATCH, &uri, Some(&alice), json!({"title": "Home"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(request(Method::PATCH, &uri, Some(&alice), json!({"title": "Work"})))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn listing_is_own_buckets_only() {
        let app = TestApp::new().await;
        let (alice_id, alice) = app.user("alice").await;
        let (bob_id, _) = app.user("bob").await;
        app.bucket(alice_id, "Groceries", false).await;
        app.bucket(alice_id, "Garden", true).await;
        app.bucket(bob_id, "Garage", true).await;

        let (status, body) = app
            .send(request(Method::GET, "/buckets", Some(&alice), json!(null)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (_, body) = app
            .send(request(
                Method::GET,
                "/buckets?visibility=public",
                Some(&alice),
                json!(null),
            ))
            .await;
        assert_eq!(body["data"][0]["title"], "Garden");
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = app
            .send(request(Method::GET, "/buckets?query=G", Some(&alice), json!(null)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(request(Method::GET, "/buckets", None, json!(null)))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_requests_get_the_error_envelope() {
        let app = TestApp::new().await;
        let (alice_id, alice) = app.user("alice").await;
        let bucket = app.bucket(alice_id, "Groceries", false).await;

        let (status, body) = app
            .send(request(Method::POST, "/buckets", Some(&alice), json!({"title": 5})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(body["error"].is_string());

        let (status, body) = app
            .send(request(Method::GET, "/buckets/abc", Some(&alice), json!(null)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);

        let (status, body) = app
            .send(request(Method::GET, "/buckets?page=-1", Some(&alice), json!(null)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);

        let uri = format!("/buckets/{}", bucket.id);
        let (status, body) = app
            .send(request(Method::PATCH, &uri, None, json!({"title": 5})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
    }

    #[tokio::test]
    async fn token_for_deleted_account_cannot_create() {
        let app = TestApp::new().await;
        let (alice_id, alice) = app.user("alice").await;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(alice_id)
            .execute(&*app.state.users.db)
            .await
            .unwrap();

        let (status, _) = app
            .send(request(Method::POST, "/buckets", Some(&alice), json!({"title": "Ghost"})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
