//! GET /sse - register a client and stream its frames

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde::Deserialize;
use tracing::debug;

use super::rest::ApiError;
use super::state::AppState;
use super::bearer_token;
use crate::sse::{ChannelSink, SharedSseManager};

/// Query parameters for SSE connection
#[derive(Debug, Default, Deserialize)]
pub struct SseParams {
    /// Bearer token (alternative to the Authorization header)
    pub token: Option<String>,
    /// Comma-separated entity ids to subscribe to right away
    pub entity_id: Option<String>,
    /// Comma-separated domains
    pub domain: Option<String>,
    /// Comma-separated event types
    pub events: Option<String>,
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Removes the client once the HTTP stream goes away
struct ClientGuard {
    manager: SharedSseManager,
    client_id: String,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        debug!(client_id = %self.client_id, "stream closed");
        self.manager.remove_client(&self.client_id);
    }
}

pub async fn sse_handler(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(params): Query<SseParams>,
) -> Response {
    let token = params
        .token
        .as_deref()
        .or_else(|| bearer_token(&headers))
        .unwrap_or_default()
        .to_string();
    let address = state.source_address(&headers, peer.as_ref());

    let (sink, mut rx) = ChannelSink::channel();
    let Some(client) = state.sse.add_client(Box::new(sink), &token, &address) else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new("Connection refused", "CONNECTION_REFUSED")),
        )
            .into_response();
    };

    if client.authenticated {
        for entity_id in split_list(params.entity_id.as_deref()) {
            state.sse.subscribe_to_entity(&client.id, entity_id);
        }
        for domain in split_list(params.domain.as_deref()) {
            state.sse.subscribe_to_domain(&client.id, domain);
        }
        for event_type in split_list(params.events.as_deref()) {
            state.sse.subscribe_to_event(&client.id, event_type);
        }
    }

    let guard = ClientGuard {
        manager: state.sse.clone(),
        client_id: client.id,
    };

    let stream = async_stream::stream! {
        let _guard = guard;
        // ends when the manager drops the client's sink
        while let Some(frame) = rx.recv().await {
            yield Ok::<_, Infallible>(Event::default().data(frame));
        }
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::default().interval(Duration::from_secs(30)))
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        let items: Vec<&str> = split_list(Some(" light.a, ,light.b ")).collect();
        assert_eq!(items, vec!["light.a", "light.b"]);
        assert_eq!(split_list(None).count(), 0);
    }
}
