//! Shared URL helpers for site fetchers.

use crate::HostingError;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Characters that are safe to forward in an API path without escaping.
static SAFE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9()._!^]*$").unwrap());

/// A URL embedded in free text.
static TEXT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(http|ftp|https)://([\w_-]+(?:(?:\.[\w_-]+)+))([\w.,@?^=%&:/~+#-]*[\w@?^=%&/~+#-])")
        .unwrap()
});

/// Whether a path component contains characters that are problematic in URLs.
pub fn is_unsafe_path(component: &str) -> bool {
    !SAFE_CHARS_RE.is_match(component)
}

/// Check a path component before it is forwarded to a remote API.
pub fn safe_segment(component: &str) -> Result<&str, HostingError> {
    if component.is_empty() {
        return Err(HostingError::InvalidUrl(component.to_string()));
    }
    if is_unsafe_path(component) {
        return Err(HostingError::UnsafePath(component.to_string()));
    }
    Ok(component)
}

/// The first two path segments of a project URL, both checked for safety.
///
/// For forges this is owner and repository; for registries the second
/// element is the package name (`pypi.org/project/<name>`).
pub fn project_path(url: &Url) -> Result<(&str, &str), HostingError> {
    let mut segments = url
        .path_segments()
        .ok_or_else(|| HostingError::InvalidUrl(url.to_string()))?;
    match (segments.next(), segments.next()) {
        (Some(first), Some(second)) if !first.is_empty() && !second.is_empty() => {
            Ok((safe_segment(first)?, safe_segment(second)?))
        }
        _ => Err(HostingError::InvalidUrl(url.to_string())),
    }
}

/// The first link found in a piece of plain text.
pub fn extract_link(text: &str) -> Option<&str> {
    TEXT_LINK_RE.find(text).map(|m| m.as_str())
}
