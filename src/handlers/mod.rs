//! HTTP handlers. Each one resolves the caller, runs the guard, then talks
//! to the store.

use serde::Serialize;

pub mod attachment_handlers;
pub mod auth_handlers;
pub mod bucket_handlers;
pub mod extract;
pub mod health_handlers;
pub mod item_handlers;
pub mod user_handlers;

/// `{"data": ...}` response envelope.
#[derive(Serialize, Debug)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Body of create/update/delete responses.
#[derive(Serialize, Debug)]
pub struct IdRef {
    pub id: i64,
}
