//! Upstream ingest endpoints
//!
//! The smart-home platform (or a relay in front of it) posts state changes
//! and events here; each one is fanned out to matching subscribers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use tracing::debug;

use super::{authorize, ApiFailure};
use crate::api::state::AppState;
use crate::types::{EntityState, HassEvent};

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub delivered: usize,
}

/// POST /api/events/state
pub async fn state_changed(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(entity): Json<EntityState>,
) -> Result<Json<IngestResponse>, ApiFailure> {
    authorize(&state, &headers, peer.as_ref())?;

    let entity_id = entity.entity_id.clone();
    let delivered = state.sse.broadcast_state_change(entity);
    debug!(entity_id = %entity_id, delivered, "state change ingested");
    Ok(Json(IngestResponse { delivered }))
}

/// POST /api/events/event
pub async fn event(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(event): Json<HassEvent>,
) -> Result<Json<IngestResponse>, ApiFailure> {
    authorize(&state, &headers, peer.as_ref())?;

    let delivered = state.sse.broadcast_event(&event);
    debug!(event_type = %event.event_type, delivered, "event ingested");
    Ok(Json(IngestResponse { delivered }))
}
