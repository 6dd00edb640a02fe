//! Defines routes for the to-do API.
//!
//! ## Structure
//! - **Health**
//!   - `GET    /healthz`, `GET /readyz`
//!
//! - **Accounts**
//!   - `POST   /sign-up`: register
//!   - `POST   /sign-in`: exchange credentials for a bearer token
//!   - `POST   /forgot-password`
//!   - `GET    /me`: own profile
//!   - `POST   /me/update`: multipart profile update
//!
//! - **Buckets**
//!   - `GET    /buckets`: own buckets (page, limit, query, visibility)
//!   - `POST   /buckets`: create
//!   - `GET    /buckets/{bucket_id}`: public, or own private
//!   - `PATCH  /buckets/{bucket_id}`: owner only
//!   - `DELETE /buckets/{bucket_id}`: owner only
//!
//! - **Items** under `/buckets/{bucket_id}/items`
//!   - `GET`, `POST` on the collection; `GET`, `PATCH`, `DELETE` on `/{item_id}`
//!
//! - **Attachments** under `/buckets/{bucket_id}/items/{item_id}/attachments`
//!   - `GET`, `POST` on the collection; `GET`, `DELETE` on `/{attachment_id}`

use crate::{
    handlers::{
        attachment_handlers::{
            delete_attachment, download_attachment, list_attachments, upload_attachment,
        },
        auth_handlers::{forgot_password, sign_in, sign_up},
        bucket_handlers::{create_bucket, delete_bucket, get_bucket, list_buckets, update_bucket},
        health_handlers::{healthz, readyz},
        item_handlers::{create_item, delete_item, get_item, list_items, update_item},
        user_handlers::{get_profile, update_profile},
    },
    state::AppState,
    validation::MAX_UPLOAD_BYTES,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Room for multipart boundaries and part headers on top of the payload.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build and return the router for every endpoint.
///
/// The router carries shared state (`AppState`); handlers pull the service
/// they need out of it with `State<T>`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // accounts
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route("/forgot-password", post(forgot_password))
        .route("/me", get(get_profile))
        .route("/me/update", post(update_profile))
        // buckets
        .route("/buckets", get(list_buckets).post(create_bucket))
        .route(
            "/buckets/{bucket_id}",
            get(get_bucket).patch(update_bucket).delete(delete_bucket),
        )
        // items
        .route(
            "/buckets/{bucket_id}/items",
            get(list_items).post(create_item),
        )
        .route(
            "/buckets/{bucket_id}/items/{item_id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
        // attachments
        .route(
            "/buckets/{bucket_id}/items/{item_id}/attachments",
            get(list_attachments).post(upload_attachment),
        )
        .route(
            "/buckets/{bucket_id}/items/{item_id}/attachments/{attachment_id}",
            get(download_attachment).delete(delete_attachment),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{TestApp, request};

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let app = TestApp::new().await;
        let (status, _) = app
            .send(request(Method::GET, "/nope", None, json!(null)))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn healthz_is_mounted() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send(request(Method::GET, "/healthz", None, json!(null)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
