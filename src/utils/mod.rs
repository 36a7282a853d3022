//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Check that a string parses as an absolute http(s) URL.
pub fn is_http_url(s: &str) -> bool {
    Url::parse(s)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Strip any trailing slashes from a base URL so path synthesis can append
/// `/segment` without doubling separators.
pub fn normalize_base_url(base: &str) -> &str {
    base.trim_end_matches('/')
}
