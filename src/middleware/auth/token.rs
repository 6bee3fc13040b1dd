use axum::http::HeaderMap;

use crate::error::AppError;

/// Fixed credential header. The value is an opaque token, forwarded verbatim.
pub const TOKEN_HEADER: &str = "token";

/// Read the caller's token.
///
/// Absent, empty and non-UTF-8 values are all treated as "no credential".
pub fn extract(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .ok_or(AppError::MissingCredential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_the_token_header() {
        let mut h = HeaderMap::new();
        h.insert("token", HeaderValue::from_static("abc.def"));
        assert_eq!(extract(&h).unwrap(), "abc.def");
    }

    #[test]
    fn missing_or_empty_is_missing_credential() {
        assert!(matches!(
            extract(&HeaderMap::new()),
            Err(AppError::MissingCredential)
        ));

        let mut h = HeaderMap::new();
        h.insert("token", HeaderValue::from_static(""));
        assert!(matches!(extract(&h), Err(AppError::MissingCredential)));
    }

    #[test]
    fn non_utf8_is_missing_credential() {
        let mut h = HeaderMap::new();
        h.insert("token", HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());
        assert!(matches!(extract(&h), Err(AppError::MissingCredential)));
    }

    #[test]
    fn bearer_header_is_not_a_token() {
        let mut h = HeaderMap::new();
        h.insert("authorization", HeaderValue::from_static("Bearer abc"));
        assert!(extract(&h).is_err());
    }
}
