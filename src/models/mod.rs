//! Core data models for the to-do service.
//!
//! These entities represent users and the buckets, items and attachments
//! they own. They map cleanly to database tables via `sqlx::FromRow` and
//! serialize naturally as JSON via `serde`.

pub mod attachment;
pub mod bucket;
pub mod item;
pub mod user;
