//! HTTP transport for the push channel
//!
//! Provides the SSE stream plus REST endpoints for subscriptions,
//! statistics, upstream ingest and token checks.

pub mod http;
pub mod rest;
pub mod state;
pub mod stream;

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;

pub use http::create_router;
pub use state::AppState;

/// Extract the token from an Authorization header.
/// Supports: "Bearer <token>" or just "<token>"
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get("Authorization")?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Caller address used for lockout accounting.
///
/// The socket peer IP, unless `trust_forwarded_for` is set, in which case the
/// first `X-Forwarded-For` hop wins. Only enable that behind a proxy that
/// overwrites the header.
pub fn source_address(
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
    trust_forwarded_for: bool,
) -> String {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let (true, Some(forwarded)) = (trust_forwarded_for, forwarded) {
        return forwarded.to_string();
    }

    peer.map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_with_and_without_prefix() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert("Authorization", HeaderValue::from_static("abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert("Authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_source_address_uses_peer_by_default() {
        let peer = ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 5555)));
        let mut headers = HeaderMap::new();
        assert_eq!(source_address(&headers, Some(&peer), false), "10.0.0.7");
        assert_eq!(source_address(&headers, None, false), "unknown");

        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(source_address(&headers, Some(&peer), false), "10.0.0.7");
        assert_eq!(source_address(&headers, None, false), "unknown");
    }

    #[test]
    fn test_source_address_trusts_forwarded_for_when_enabled() {
        let peer = ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 5555)));
        let mut headers = HeaderMap::new();
        assert_eq!(source_address(&headers, Some(&peer), true), "10.0.0.7");

        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(source_address(&headers, Some(&peer), true), "203.0.113.9");
    }
}
