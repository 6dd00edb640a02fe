//! Identity resolution: bearer credential in, [`Principal`] out.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;

use super::{
    guard,
    token::{CredentialVerifier, TokenService},
};
use crate::errors::AppError;

/// The caller of a single request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    Authenticated { user_id: i64 },
}

impl Principal {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Principal::Anonymous => None,
            Principal::Authenticated { user_id } => Some(*user_id),
        }
    }
}

/// Resolve an optional bearer token into a principal.
///
/// Never fails. A token that does not verify, or whose subject is not an
/// integer user id, resolves to [`Principal::Anonymous`] exactly like a
/// missing one.
pub fn resolve<V>(verifier: &V, credential: Option<&str>) -> Principal
where
    V: CredentialVerifier + ?Sized,
{
    let Some(token) = credential else {
        return Principal::Anonymous;
    };

    let Some(verified) = verifier.verify(token) else {
        return Principal::Anonymous;
    };

    match verified.subject.parse::<i64>() {
        Ok(user_id) => {
            debug!(user_id, expires_at = verified.expires_at, "resolved bearer token");
            Principal::Authenticated { user_id }
        }
        Err(_) => {
            debug!(subject = %verified.subject, "token subject is not a user id");
            Principal::Anonymous
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A missing or malformed Authorization header is just "no credential".
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok();
        let tokens = TokenService::from_ref(state);

        Ok(resolve(
            &tokens,
            bearer.as_ref().map(|TypedHeader(auth)| auth.token()),
        ))
    }
}

/// Extractor for endpoints that require a signed-in user.
///
/// Rejects with 401 when the request resolves to an anonymous principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Authenticated(pub i64);

impl From<Authenticated> for Principal {
    fn from(Authenticated(user_id): Authenticated) -> Self {
        Principal::Authenticated { user_id }
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = match Principal::from_request_parts(parts, state).await {
            Ok(principal) => principal,
            Err(never) => match never {},
        };
        Ok(Authenticated(guard::require_authenticated(&principal)?))
    }
}
