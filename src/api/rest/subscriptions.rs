//! Subscription endpoints

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{authorize, ApiError, ApiFailure};
use crate::api::state::AppState;
use crate::sse::ClientInfo;

/// Body of subscribe / unsubscribe requests
#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub client_id: String,
    pub entity_id: Option<String>,
    pub domain: Option<String>,
    pub event_type: Option<String>,
}

impl SubscriptionRequest {
    fn is_empty(&self) -> bool {
        self.entity_id.is_none() && self.domain.is_none() && self.event_type.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub success: bool,
    pub client: ClientInfo,
}

/// Resolve the target client, requiring it to be authenticated
fn authenticated_client(state: &AppState, request: &SubscriptionRequest) -> Result<(), ApiFailure> {
    if request.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request(
                "One of entity_id, domain or event_type is required",
            )),
        ));
    }

    match state.sse.client_info(&request.client_id) {
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!(
                "Client '{}' not found",
                request.client_id
            ))),
        )),
        Some(info) if !info.authenticated => Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::forbidden("Client is not authenticated")),
        )),
        Some(_) => Ok(()),
    }
}

fn respond(state: &AppState, client_id: &str) -> Result<Json<SubscriptionResponse>, ApiFailure> {
    // the client can vanish between the update and this read
    state
        .sse
        .client_info(client_id)
        .map(|client| {
            Json(SubscriptionResponse {
                success: true,
                client,
            })
        })
        .ok_or_else(|| {
            (
                StatusCode::GONE,
                Json(ApiError::new("Client disconnected", "GONE")),
            )
        })
}

/// POST /api/sse/subscribe
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<SubscriptionRequest>,
) -> Result<Json<SubscriptionResponse>, ApiFailure> {
    authorize(&state, &headers, peer.as_ref())?;
    authenticated_client(&state, &request)?;

    let id = &request.client_id;
    if let Some(entity_id) = &request.entity_id {
        state.sse.subscribe_to_entity(id, entity_id);
    }
    if let Some(domain) = &request.domain {
        state.sse.subscribe_to_domain(id, domain);
    }
    if let Some(event_type) = &request.event_type {
        state.sse.subscribe_to_event(id, event_type);
    }

    respond(&state, id)
}

/// POST /api/sse/unsubscribe
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<SubscriptionRequest>,
) -> Result<Json<SubscriptionResponse>, ApiFailure> {
    authorize(&state, &headers, peer.as_ref())?;
    authenticated_client(&state, &request)?;

    let id = &request.client_id;
    if let Some(entity_id) = &request.entity_id {
        state.sse.unsubscribe_from_entity(id, entity_id);
    }
    if let Some(domain) = &request.domain {
        state.sse.unsubscribe_from_domain(id, domain);
    }
    if let Some(event_type) = &request.event_type {
        state.sse.unsubscribe_from_event(id, event_type);
    }

    respond(&state, id)
}

/// GET /api/sse/clients/:id
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ClientInfo>, ApiFailure> {
    authorize(&state, &headers, peer.as_ref())?;

    state.sse.client_info(&id).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("Client '{}' not found", id))),
        )
    })
}
