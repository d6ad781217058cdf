use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};

pub const SESSION_COOKIE: &str = "session_token";

/// Axum extractor for the session token cookie.
///
/// Carries `None` when the browser has no session yet; handlers that
/// need a session (cart, login) mint one lazily and set the cookie on
/// the way out.
#[derive(Debug, Clone)]
pub struct SessionToken(pub Option<String>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionToken(extract_session_cookie(&parts.headers)))
    }
}

fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;

    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Set-Cookie value for a freshly issued session
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token
    )
}

/// Set-Cookie value that clears the session on logout
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; session_token=abc-123; lang=en"),
        );

        assert_eq!(
            extract_session_cookie(&headers),
            Some("abc-123".to_string())
        );
    }

    #[test]
    fn test_extract_missing_or_empty_cookie() {
        let headers = HeaderMap::new();
        assert_eq!(extract_session_cookie(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session_token="));
        assert_eq!(extract_session_cookie(&headers), None);
    }

    #[test]
    fn test_cookie_round_trip() {
        let cookie = session_cookie("tok-1");
        assert!(cookie.starts_with("session_token=tok-1;"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
