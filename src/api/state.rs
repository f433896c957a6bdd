//! Shared application state for HTTP handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;

use crate::auth::{SharedTokenManager, TokenManager};
use crate::config::BridgeConfig;
use crate::sse::{SharedSseManager, SseManager};

/// State handed to every handler
pub struct AppState {
    /// Push channel registry
    pub sse: SharedSseManager,
    /// Token gate, shared with the registry
    pub tokens: SharedTokenManager,
    /// Take the lockout address from `X-Forwarded-For`
    pub trust_forwarded_for: bool,
}

impl AppState {
    /// Build the token manager and registry from configuration
    pub fn new(config: &BridgeConfig) -> Self {
        let tokens = Arc::new(TokenManager::new(config.token.clone()));
        let sse = Arc::new(SseManager::new(config.sse.clone(), tokens.clone()));
        Self {
            sse,
            tokens,
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    /// State over existing managers; forwarded headers are not trusted
    pub fn from_parts(sse: SharedSseManager, tokens: SharedTokenManager) -> Self {
        Self {
            sse,
            tokens,
            trust_forwarded_for: false,
        }
    }

    /// Lockout address for a request
    pub fn source_address(
        &self,
        headers: &HeaderMap,
        peer: Option<&ConnectInfo<SocketAddr>>,
    ) -> String {
        super::source_address(headers, peer, self.trust_forwarded_for)
    }
}
