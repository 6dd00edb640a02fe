//! Account registration and sign-in.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Data, IdRef, extract::JsonBody};
use crate::{
    auth::TokenService, errors::AppError, services::user_service::UserService, validation,
};

#[derive(Debug, Deserialize)]
pub struct SignUpReq {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordReq {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST `/sign-up`: register a new account.
pub async fn sign_up(
    State(users): State<UserService>,
    JsonBody(req): JsonBody<SignUpReq>,
) -> Result<impl IntoResponse, AppError> {
    validation::username(&req.username)?;
    validation::email(&req.email)?;
    validation::password(&req.password)?;

    let user = users
        .register(&req.username, &req.email, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(Data::new(IdRef { id: user.id }))))
}

/// POST `/sign-in`: exchange credentials for a bearer token.
pub async fn sign_in(
    State(users): State<UserService>,
    State(tokens): State<TokenService>,
    JsonBody(req): JsonBody<SignInReq>,
) -> Result<Json<SignInResponse>, AppError> {
    let user = users.authenticate(&req.email, &req.password).await?;
    let access_token = tokens.issue(user.id, &user.email)?;
    info!(user_id = user.id, "issued access token");
    Ok(Json(SignInResponse { access_token }))
}

/// POST `/forgot-password`: accepted, but recovery mail is not wired up.
pub async fn forgot_password(
    JsonBody(req): JsonBody<ForgotPasswordReq>,
) -> Result<impl IntoResponse, AppError> {
    validation::email(&req.email)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If the account exists, recovery instructions will follow".into(),
        }),
    ))
}
