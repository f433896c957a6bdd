//! Token check endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::api::state::AppState;
use crate::auth::TokenValidation;

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub token: String,
}

/// POST /auth/validate - `{valid, error}` for the given token.
///
/// Failures count towards the caller's lockout like any other validation.
pub async fn validate(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<ValidateRequest>,
) -> Json<TokenValidation> {
    let address = state.source_address(&headers, peer.as_ref());
    Json(state.tokens.validate(&request.token, &address))
}
