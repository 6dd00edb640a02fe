use axum::extract::FromRef;

use crate::{
    auth::TokenService,
    services::{todo_service::TodoService, user_service::UserService},
};

/// Shared state handed to every handler.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub todos: TodoService,
    pub users: UserService,
    pub tokens: TokenService,
}
