//! Bearer token verification for the `/post` sink.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::warn;

/// Check the `Authorization` header against `Bearer <expected>`.
///
/// A missing header, a different scheme, or a wrong token all fail.
pub fn verify_bearer(headers: &HeaderMap, expected: &str) -> bool {
    let Some(provided) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        warn!("post_auth_missing");
        return false;
    };

    let valid = provided
        .strip_prefix("Bearer ")
        .map(|token| constant_time_compare(token, expected))
        .unwrap_or(false);

    if !valid {
        warn!(actual_length = provided.len(), "post_auth_invalid");
    }

    valid
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Check if bearer verification is enabled.
pub fn is_auth_enabled(token: &Option<String>) -> bool {
    token
        .as_ref()
        .map(|t| !t.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_verify_bearer_valid() {
        assert!(verify_bearer(&headers("Bearer token123"), "token123"));
    }

    #[test]
    fn test_verify_bearer_rejects_wrong_token() {
        assert!(!verify_bearer(&headers("Bearer token124"), "token123"));
        assert!(!verify_bearer(&headers("Basic token123"), "token123"));
        assert!(!verify_bearer(&headers("token123"), "token123"));
    }

    #[test]
    fn test_verify_bearer_rejects_missing_header() {
        assert!(!verify_bearer(&HeaderMap::new(), "token123"));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_is_auth_enabled() {
        assert!(!is_auth_enabled(&None));
        assert!(!is_auth_enabled(&Some("".to_string())));
        assert!(!is_auth_enabled(&Some("   ".to_string())));
        assert!(is_auth_enabled(&Some("token123".to_string())));
    }
}
