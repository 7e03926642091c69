//! Utility functions and helpers.

pub mod http;
pub mod retry;

use url::Url;

use crate::error::Result;

/// Parse a base URL, treating its last path segment as a directory.
///
/// `https://host/api/permits` and `https://host/api/permits/` both resolve
/// relative paths underneath `permits/`.
pub fn parse_base_url(base: &str) -> Result<Url> {
    let trimmed = base.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

/// Resolve a relative path against a base URL.
pub fn resolve_url(base: &Url, path: &str) -> Result<Url> {
    Ok(base.join(path.trim_start_matches('/'))?)
}
