//! Authentication and authorization.
//!
//! - [`token`] issues and verifies signed bearer tokens.
//! - [`identity`] turns an optional bearer token into a [`Principal`].
//! - [`guard`] decides whether a principal may read or change a bucket,
//!   item or attachment.
//! - [`password`] hashes and checks account passwords.
//!
//! Resolution never fails: a missing or broken token is simply
//! [`Principal::Anonymous`]. Endpoints that need a user enforce it through
//! the guard, which reports one of the [`AccessError`] kinds.

pub mod error;
pub mod guard;
pub mod identity;
pub mod password;
pub mod token;

pub use error::AccessError;
pub use identity::{Authenticated, Principal};
pub use token::TokenService;
