//! Request extractors whose rejections are rendered as [`AppError`], so a
//! malformed body, path or query string gets the same `{"error","status"}`
//! 400 as any other validation failure.

use axum::extract::{FromRequest, FromRequestParts};
use serde::{Deserialize, Deserializer, de};

use crate::errors::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParams<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// Query flag accepting `true`/`false` as well as `1`/`0`.
pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match raw.as_str() {
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        other => Err(de::Error::invalid_value(
            de::Unexpected::Str(other),
            &"true, false, 1 or 0",
        )),
    }
}
