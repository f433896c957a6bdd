//! Statistics endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};

use super::{authorize, ApiFailure};
use crate::api::state::AppState;
use crate::sse::SseStatistics;

/// GET /api/sse/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Json<SseStatistics>, ApiFailure> {
    authorize(&state, &headers, peer.as_ref())?;
    Ok(Json(state.sse.get_statistics()))
}
