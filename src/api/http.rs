//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::rest::{auth, ingest, stats, subscriptions};
use super::state::AppState;
use super::stream::sse_handler;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration - dashboards connect from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // SSE stream
        .route("/sse", get(sse_handler))
        // Health check
        .route("/health", get(health_check))
        // Subscriptions
        .route("/api/sse/subscribe", post(subscriptions::subscribe))
        .route("/api/sse/unsubscribe", post(subscriptions::unsubscribe))
        .route("/api/sse/clients/:id", get(subscriptions::get_client))
        .route("/api/sse/stats", get(stats::get_stats))
        // Upstream ingest
        .route("/api/events/state", post(ingest::state_changed))
        .route("/api/events/event", post(ingest::event))
        // Token checks
        .route("/auth/validate", post(auth::validate))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_check() {
        let state = Arc::new(AppState::new(&BridgeConfig::default()));
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }
}
