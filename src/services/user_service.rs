//! UserService: accounts, sign-in and profile updates.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use tracing::{debug, info};

use super::{StoreError, StoreResult};
use crate::{
    auth::{
        AccessError,
        error::AccessResult,
        password::{hash_password, verify_password},
    },
    models::user::{User, UserPatch},
};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, avatar, avatar_content_type, created_at";

#[derive(Clone)]
pub struct UserService {
    pub db: Arc<SqlitePool>,
}

impl UserService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(user)
    }

    pub async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&*self.db)
        .await?;
        Ok(user)
    }

    /// Register a new account. Fails validation if the email is taken.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> AccessResult<User> {
        if self.find_user_by_email(email).await?.is_some() {
            return Err(AccessError::invalid("user already exists"));
        }

        let password_hash = hash(password).await?;
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await
        .map_err(StoreError::from)?;

        info!(user_id = user.id, "registered user");
        Ok(user)
    }

    /// Check an email/password pair. Unknown email and wrong password are
    /// both `Unauthorized`.
    pub async fn authenticate(&self, email: &str, password: &str) -> AccessResult<User> {
        let Some(user) = self.find_user_by_email(email).await? else {
            debug!("sign-in for unknown email");
            return Err(AccessError::Unauthorized);
        };

        let candidate = password.to_owned();
        let phc = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&candidate, &phc))
            .await
            .map_err(StoreError::from)?;

        if matches {
            Ok(user)
        } else {
            debug!(user_id = user.id, "sign-in with wrong password");
            Err(AccessError::Unauthorized)
        }
    }

    /// Apply a profile patch to `user_id`, touching only the fields present.
    pub async fn update_profile(&self, user_id: i64, patch: UserPatch) -> AccessResult<User> {
        if let Some(email) = &patch.email {
            if let Some(other) = self.find_user_by_email(email).await? {
                if other.id != user_id {
                    return Err(AccessError::invalid("email already in use"));
                }
            }
        }

        if patch.is_empty() {
            return self
                .find_user(user_id)
                .await?
                .ok_or(AccessError::NotFound("user"));
        }

        let password_hash = match &patch.password {
            Some(password) => Some(hash(password).await?),
            None => None,
        };

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE users SET ");
        let mut set = builder.separated(", ");
        if let Some(username) = &patch.username {
            set.push("username = ");
            set.push_bind_unseparated(username);
        }
        if let Some(email) = &patch.email {
            set.push("email = ");
            set.push_bind_unseparated(email);
        }
        if let Some(password_hash) = &password_hash {
            set.push("password_hash = ");
            set.push_bind_unseparated(password_hash);
        }
        if let Some(avatar) = &patch.avatar {
            set.push("avatar = ");
            set.push_bind_unseparated(&avatar.data);
            set.push("avatar_content_type = ");
            set.push_bind_unseparated(&avatar.content_type);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(user_id);
        builder.push(format!(" RETURNING {USER_COLUMNS}"));

        let updated: Option<User> = builder
            .build_query_as()
            .fetch_optional(&*self.db)
            .await
            .map_err(StoreError::from)?;

        info!(user_id, "updated profile");
        updated.ok_or(AccessError::NotFound("user"))
    }
}

async fn hash(password: &str) -> StoreResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await?
        .map_err(|err| StoreError::PasswordHash(err.to_string()))
}
