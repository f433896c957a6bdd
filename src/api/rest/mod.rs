//! REST API module for HTTP endpoints
//!
//! - `POST /api/sse/subscribe` / `POST /api/sse/unsubscribe` - manage a client's subscriptions
//! - `GET /api/sse/clients/:id` - inspect one client
//! - `GET /api/sse/stats` - registry statistics
//! - `POST /api/events/state` / `POST /api/events/event` - upstream ingest
//! - `POST /auth/validate` - token check

pub mod auth;
pub mod ingest;
pub mod stats;
pub mod subscriptions;

use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use super::state::AppState;
use super::bearer_token;
use crate::auth::{Claims, TokenRejection};

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>, code: &str) -> Self {
        Self {
            error: message.into(),
            code: code.to_string(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, "NOT_FOUND")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, "BAD_REQUEST")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(message, "FORBIDDEN")
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message, "UNAUTHORIZED")
    }
}

/// Error half of a handler result
pub type ApiFailure = (StatusCode, Json<ApiError>);

/// Require a valid bearer token on the request
pub fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
) -> Result<Claims, ApiFailure> {
    let Some(token) = bearer_token(headers) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiError::unauthorized("Missing authentication token")),
        ));
    };

    let address = state.source_address(headers, peer);
    state.tokens.validate_token(token, &address).map_err(|rejection| {
        let status = match rejection {
            TokenRejection::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            TokenRejection::MissingSecret => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::UNAUTHORIZED,
        };
        (status, Json(ApiError::unauthorized(rejection.to_string())))
    })
}
