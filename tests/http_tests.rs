//! Router-level tests for the HTTP transport

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use hass_bridge::api::{create_router, AppState};
use hass_bridge::config::{BridgeConfig, TokenConfig};
use serde_json::{json, Value};
use tower::util::ServiceExt;

const SECRET: &str = "http-test-secret-key-with-at-least-32-chars";

fn setup(config: BridgeConfig) -> (Arc<AppState>, Router, String) {
    let state = Arc::new(AppState::new(&config));
    let token = state.tokens.generate_token(json!({"sub": "http"})).unwrap();
    let app = create_router(state.clone());
    (state, app, token)
}

fn default_config() -> BridgeConfig {
    BridgeConfig {
        token: TokenConfig::with_secret(SECRET),
        ..BridgeConfig::default()
    }
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_stats_requires_bearer_token() {
    let (_, app, token) = setup(default_config());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/sse/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sse/stats")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = json_body(response).await;
    assert_eq!(stats["total_clients"], 0);
    assert!(stats["clients_by_connection_time"]["less_than_1m"].is_number());
}

#[tokio::test]
async fn test_sse_stream_receives_ingested_state() {
    let (state, app, token) = setup(default_config());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/sse?token={token}&domain=light"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(state.sse.client_count(), 1);

    let mut stream = response.into_body().into_data_stream();
    let hello = stream.next().await.unwrap().unwrap();
    let hello = String::from_utf8_lossy(&hello);
    assert!(hello.contains("\"type\":\"connection\""));
    assert!(hello.contains("\"authenticated\":true"));

    let ingest = app
        .oneshot(post_json(
            "/api/events/state",
            Some(&token),
            json!({"entity_id": "light.kitchen", "state": "on", "attributes": {}}),
        ))
        .await
        .unwrap();
    assert_eq!(ingest.status(), StatusCode::OK);
    assert_eq!(json_body(ingest).await["delivered"], 1);

    let update = stream.next().await.unwrap().unwrap();
    assert!(String::from_utf8_lossy(&update).contains("light.kitchen"));

    drop(stream);
    assert_eq!(state.sse.client_count(), 0);
}

#[tokio::test]
async fn test_subscribe_endpoint() {
    let (state, app, token) = setup(default_config());

    let (sink, _rx) = hass_bridge::sse::ChannelSink::channel();
    let authed = state
        .sse
        .add_client(Box::new(sink), &token, "127.0.0.1")
        .unwrap();
    let (sink, _rx2) = hass_bridge::sse::ChannelSink::channel();
    let anonymous = state.sse.add_client(Box::new(sink), "", "127.0.0.1").unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/sse/subscribe",
            Some(&token),
            json!({"client_id": authed.id, "entity_id": "light.kitchen", "event_type": "call_service"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["client"]["subscriptions"]["entities"], json!(["light.kitchen"]));
    assert_eq!(body["client"]["subscriptions"]["events"], json!(["call_service"]));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/sse/unsubscribe",
            Some(&token),
            json!({"client_id": authed.id, "entity_id": "light.kitchen"}),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["client"]["subscriptions"]["entities"], json!([]));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/sse/subscribe",
            Some(&token),
            json!({"client_id": anonymous.id, "domain": "light"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/sse/subscribe",
            Some(&token),
            json!({"client_id": "sse_missing", "domain": "light"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(post_json(
            "/api/sse/subscribe",
            Some(&token),
            json!({"client_id": authed.id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validate_endpoint() {
    let (_, app, token) = setup(default_config());

    let response = app
        .clone()
        .oneshot(post_json("/auth/validate", None, json!({"token": token})))
        .await
        .unwrap();
    assert_eq!(json_body(response).await, json!({"valid": true}));

    let response = app
        .oneshot(post_json("/auth/validate", None, json!({"token": ""})))
        .await
        .unwrap();
    assert_eq!(
        json_body(response).await,
        json!({"valid": false, "error": "Invalid token format"})
    );
}

#[tokio::test]
async fn test_refused_connection_when_rejecting_unauthenticated() {
    let mut config = default_config();
    config.sse.reject_unauthenticated = true;
    let (state, app, _) = setup(config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/sse?token=definitely-not-a-valid-token-value")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(state.sse.client_count(), 0);
}

fn validate_from_peer(forwarded_for: &str) -> Request<Body> {
    let mut request = post_json(
        "/auth/validate",
        None,
        json!({"token": "g".repeat(64)}),
    );
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4242))));
    request
        .headers_mut()
        .insert("X-Forwarded-For", forwarded_for.parse().unwrap());
    request
}

#[tokio::test]
async fn test_rotating_forwarded_for_still_locks_out_peer() {
    let (state, app, _) = setup(default_config());
    let max = state.tokens.config().max_failed_attempts;

    for i in 0..max {
        let response = app
            .clone()
            .oneshot(validate_from_peer(&format!("10.9.9.{i}")))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["error"], "Invalid token");
    }

    let response = app
        .oneshot(validate_from_peer("10.9.9.250"))
        .await
        .unwrap();
    assert_eq!(
        json_body(response).await["error"],
        "Too many failed attempts. Please try again later."
    );
    assert_eq!(state.tokens.failed_attempts("10.0.0.7"), max);
    assert_eq!(state.tokens.failed_attempts("10.9.9.0"), 0);
}

#[tokio::test]
async fn test_forwarded_for_used_when_trusted() {
    let mut config = default_config();
    config.trust_forwarded_for = true;
    let (state, app, _) = setup(config);

    let response = app.oneshot(validate_from_peer("203.0.113.9")).await.unwrap();
    assert_eq!(json_body(response).await["valid"], false);
    assert_eq!(state.tokens.failed_attempts("203.0.113.9"), 1);
    assert_eq!(state.tokens.failed_attempts("10.0.0.7"), 0);
}
