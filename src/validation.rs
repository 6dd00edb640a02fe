//! Request shape checks. Every failure is [`AccessError::ValidationFailed`].

use crate::{
    auth::{AccessError, error::AccessResult},
    services::Page,
};

pub const TITLE_MAX_CHARS: usize = 100;
pub const CONTENT_MIN_CHARS: usize = 2;
pub const CONTENT_MAX_CHARS: usize = 1000;
pub const SEARCH_MIN_CHARS: usize = 2;
pub const SEARCH_MAX_CHARS: usize = 100;
pub const USERNAME_MAX_CHARS: usize = 100;
pub const PAGE_LIMIT_MAX: u32 = 100;
/// Upper bound for avatars and attachments.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

fn check_len(field: &str, value: &str, min: usize, max: usize) -> AccessResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AccessError::invalid(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn bucket_title(title: &str) -> AccessResult<()> {
    check_len("title", title, 1, TITLE_MAX_CHARS)?;
    if title.trim().is_empty() {
        return Err(AccessError::invalid("title must not be blank"));
    }
    Ok(())
}

pub fn item_content(content: &str) -> AccessResult<()> {
    check_len("content", content, CONTENT_MIN_CHARS, CONTENT_MAX_CHARS)
}

pub fn search_query(query: &str) -> AccessResult<()> {
    check_len("query", query, SEARCH_MIN_CHARS, SEARCH_MAX_CHARS)
}

pub fn username(name: &str) -> AccessResult<()> {
    check_len("username", name, 1, USERNAME_MAX_CHARS)
}

pub fn password(password: &str) -> AccessResult<()> {
    if password.is_empty() {
        return Err(AccessError::invalid("password must not be empty"));
    }
    Ok(())
}

/// Loose address check: one `@`, something on both sides, a dot in the
/// domain and no whitespace.
pub fn email(email: &str) -> AccessResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AccessError::invalid("email is not a valid address"))
    }
}

/// Build a page window from optional query values (defaults: page 1, limit 10).
pub fn page(page: Option<u32>, limit: Option<u32>) -> AccessResult<Page> {
    let defaults = Page::default();
    let page = page.unwrap_or(defaults.page);
    let limit = limit.unwrap_or(defaults.limit);
    if page < 1 {
        return Err(AccessError::invalid("page must be at least 1"));
    }
    if !(1..=PAGE_LIMIT_MAX).contains(&limit) {
        return Err(AccessError::invalid(format!(
            "limit must be between 1 and {PAGE_LIMIT_MAX}"
        )));
    }
    Ok(Page { page, limit })
}

pub fn upload_size(len: usize) -> AccessResult<()> {
    if len == 0 {
        return Err(AccessError::invalid("uploaded file is empty"));
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(AccessError::invalid("uploaded file exceeds 5 MiB"));
    }
    Ok(())
}
