//! Shared fixtures for unit tests: an in-memory database and a router
//! driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tower::ServiceExt;

use crate::{
    auth::TokenService,
    db,
    models::{
        bucket::{Bucket, Visibility},
        item::Item,
    },
    routes::routes::routes,
    services::{
        todo_service::{NewItem, TodoService},
        user_service::UserService,
    },
    state::AppState,
};

pub const TEST_SECRET: &[u8] = b"test-secret";

/// A migrated in-memory database. A single connection that is never
/// recycled, since every new connection would open an empty database.
pub async fn test_pool() -> Arc<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    Arc::new(pool)
}

/// Insert a user row directly, skipping password hashing.
pub async fn insert_user(db: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO users (username, email, password_hash, created_at)
         VALUES (?, ?, 'x', ?)
         RETURNING id",
    )
    .bind(name)
    .bind(format!("{name}@example.com"))
    .bind(chrono::Utc::now())
    .fetch_one(db)
    .await
    .unwrap()
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = test_pool().await;
        let state = AppState {
            todos: TodoService::new(db.clone()),
            users: UserService::new(db),
            tokens: TokenService::new(TEST_SECRET, 3600),
        };
        let router = routes().with_state(state.clone());
        Self { state, router }
    }

    /// Create a user and a valid access token for it.
    pub async fn user(&self, name: &str) -> (i64, String) {
        let id = insert_user(&self.state.users.db, name).await;
        let token = self
            .state
            .tokens
            .issue(id, &format!("{name}@example.com"))
            .unwrap();
        (id, token)
    }

    pub async fn bucket(&self, owner_id: i64, title: &str, public: bool) -> Bucket {
        let visibility = if public {
            Visibility::Public
        } else {
            Visibility::Private
        };
        self.state
            .todos
            .insert_bucket(owner_id, title, visibility)
            .await
            .unwrap()
    }

    pub async fn item(&self, bucket_id: i64, content: &str, parent_id: Option<i64>) -> Item {
        let item = NewItem {
            content: content.into(),
            parent_id,
            deadline: None,
        };
        self.state.todos.insert_item(bucket_id, &item).await.unwrap()
    }

    pub async fn raw(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Send a request and decode the JSON body. An empty body is `Null` and
    /// a non-JSON one comes back as a string.
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.raw(req).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }
}

/// Build a request with an optional bearer token. A `Null` body sends no
/// body at all; anything else is sent as JSON.
pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = if body.is_null() {
        Body::empty()
    } else {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(body.to_string())
    };
    builder.body(body).unwrap()
}
