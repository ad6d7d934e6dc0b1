use axum::http::{header, header::HeaderMap};

/// Header set by the upstream authentication gateway.
pub(super) const USER_ID_HEADER: &str = "x-user-id";

const MAX_USER_ID_LEN: usize = 128;

pub(super) fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

pub(super) fn is_admin_authorized(headers: &HeaderMap, expected_token: &str) -> bool {
    !expected_token.is_empty() && extract_bearer_token(headers) == Some(expected_token)
}

/// `/` separates store key segments, so it can never appear in an id.
pub(super) fn is_valid_user_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_USER_ID_LEN && !id.contains('/') && id.trim() == id
}

pub(super) fn extract_user_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| is_valid_user_id(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extract_bearer_token_happy_path() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn extract_bearer_token_rejects_missing_or_empty() {
        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        let mut headers2 = HeaderMap::new();
        headers2.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers2), None);
    }

    #[test]
    fn admin_requires_configured_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        assert!(is_admin_authorized(&headers, "secret"));
        assert!(!is_admin_authorized(&headers, "other"));
        assert!(!is_admin_authorized(&headers, ""));
    }

    #[test]
    fn user_id_is_trimmed_and_bounded() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  user-42 "));
        assert_eq!(extract_user_id(&headers), Some("user-42"));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("a/b"));
        assert_eq!(extract_user_id(&headers), None);

        let long = "x".repeat(MAX_USER_ID_LEN + 1);
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&long).unwrap());
        assert_eq!(extract_user_id(&headers), None);

        assert_eq!(extract_user_id(&HeaderMap::new()), None);
    }

    #[test]
    fn user_id_rules_match_for_bodies() {
        assert!(is_valid_user_id("user-123"));
        assert!(!is_valid_user_id("a/b"));
        assert!(!is_valid_user_id(" padded "));
        assert!(!is_valid_user_id(""));
        assert!(!is_valid_user_id(&"x".repeat(MAX_USER_ID_LEN + 1)));
    }
}
