//! The signed-in user's own profile.

use axum::{
    Json,
    extract::{Multipart, State},
};
use axum_extra::extract::WithRejection;

use super::auth_handlers::MessageResponse;
use crate::{
    auth::{AccessError, Authenticated},
    errors::AppError,
    models::user::{Avatar, UserPatch, UserProfile},
    services::user_service::UserService,
    validation,
};

/// GET `/me`: profile of the caller, avatar base64-encoded.
pub async fn get_profile(
    State(users): State<UserService>,
    Authenticated(user_id): Authenticated,
) -> Result<Json<UserProfile>, AppError> {
    let user = users
        .find_user(user_id)
        .await?
        .ok_or(AccessError::NotFound("user"))?;
    Ok(Json(user.into()))
}

/// POST `/me/update`: multipart profile update.
///
/// Recognised fields: `username`, `email`, `password` and an `avatar` image.
/// Empty text fields are ignored.
pub async fn update_profile(
    State(users): State<UserService>,
    Authenticated(user_id): Authenticated,
    WithRejection(mut multipart, _): WithRejection<Multipart, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut patch = UserPatch::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "username" | "email" | "password" => {
                let value = field.text().await?;
                if value.is_empty() {
                    continue;
                }
                match name.as_str() {
                    "username" => {
                        validation::username(&value)?;
                        patch.username = Some(value);
                    }
                    "email" => {
                        validation::email(&value)?;
                        patch.email = Some(value);
                    }
                    _ => patch.password = Some(value),
                }
            }
            "avatar" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !content_type.starts_with("image/") {
                    return Err(AccessError::invalid("avatar must be an image").into());
                }
                let data = field.bytes().await?;
                validation::upload_size(data.len())?;
                patch.avatar = Some(Avatar {
                    content_type,
                    data: data.to_vec(),
                });
            }
            other => {
                return Err(AccessError::invalid(format!("unexpected field `{other}`")).into());
            }
        }
    }

    users.update_profile(user_id, patch).await?;
    Ok(Json(MessageResponse {
        message: "Profile updated successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::json;

    use crate::test_support::{TestApp, request};

    const BOUNDARY: &str = "XPROFILEBOUNDARY";

    /// `(name, content type, value)`; a content type marks a file part.
    fn profile_update(token: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, content_type, value) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match content_type {
                Some(content_type) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.bin\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(value);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/me/update")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn profile_requires_a_token() {
        let app = TestApp::new().await;
        let (status, _) = app
            .send(request(Method::GET, "/me", None, json!(null)))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(request(Method::GET, "/me", Some("garbage"), json!(null)))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn update_changes_present_fields_only() {
        let app = TestApp::new().await;
        let (_, token) = app.user("alice").await;

        let (status, body) = app
            .send(profile_update(
                &token,
                &[
                    ("username", None, b"Alice A."),
                    ("email", None, b""),
                    ("avatar", Some("image/png"), &[0x89, b'P', b'N', b'G']),
                ],
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Profile updated successfully");

        let (_, body) = app
            .send(request(Method::GET, "/me", Some(&token), json!(null)))
            .await;
        assert_eq!(body["username"], "Alice A.");
        assert_eq!(body["email"], "alice@example.com");
        assert_eq!(body["avatar"], "iVBORw==");
        assert_eq!(body["avatar_content_type"], "image/png");
    }

    #[tokio::test]
    async fn update_rejects_bad_parts() {
        let app = TestApp::new().await;
        let (_, token) = app.user("alice").await;
        app.user("bob").await;

        let (status, _) = app
            .send(profile_update(&token, &[("avatar", Some("text/plain"), b"hi")]))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(profile_update(&token, &[("nickname", None, b"al")]))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .send(profile_update(&token, &[("email", None, b"bob@example.com")]))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "email already in use");
    }
}
