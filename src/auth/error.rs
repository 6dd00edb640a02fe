use thiserror::Error;

use crate::services::StoreError;

/// Message used when an item would be created under a sub-item.
pub const NESTING_TOO_DEEP: &str = "only one level of item nesting is supported";

/// Outcome of a denied request.
///
/// The first four variants are the complete authorization taxonomy. `Store`
/// carries failures of the backing store, which are never interpreted here.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No valid credential where one is required.
    #[error("Unauthorized")]
    Unauthorized,
    /// Valid credential, but the caller does not own the visible resource.
    #[error("Forbidden")]
    Forbidden,
    /// Absent, or hidden from this caller.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Malformed input or a violated constraint.
    #[error("{0}")]
    ValidationFailed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccessError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    pub fn nesting_too_deep() -> Self {
        Self::ValidationFailed(NESTING_TOO_DEEP.to_string())
    }
}

pub type AccessResult<T> = Result<T, AccessError>;
