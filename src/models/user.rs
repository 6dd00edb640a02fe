//! Represents a registered user.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A registered account.
///
/// The password hash and raw avatar bytes never leave the service; use
/// [`UserProfile`] for anything that is sent to a client.
#[derive(Clone, FromRow, Debug)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub avatar: Option<Vec<u8>>,
    pub avatar_content_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user, returned by `GET /me`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Base64-encoded avatar image, when one was uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_content_type: Option<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar: user
                .avatar
                .as_deref()
                .map(|bytes| general_purpose::STANDARD.encode(bytes)),
            avatar_content_type: user.avatar_content_type,
        }
    }
}

/// A profile update. Each field is applied only when present.
#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    /// Plain-text password; hashed before it reaches the store.
    pub password: Option<String>,
    pub avatar: Option<Avatar>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.avatar.is_none()
    }
}

/// An uploaded avatar image.
#[derive(Clone, Debug)]
pub struct Avatar {
    pub content_type: String,
    pub data: Vec<u8>,
}
