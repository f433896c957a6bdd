//! Hass Bridge push channel
//!
//! Real-time event broadcasting for a Home Assistant tool bridge, gated by
//! bearer token authentication.
//!
//! # Features
//!
//! - **Token gate**: HS256 validation with per-address lockout
//! - **Token encryption**: AES-256-GCM with a four-field wire format
//! - **Subscriptions**: by entity id, domain or event type
//! - **Replay**: last known state sent on entity subscription
//! - **Rate limiting**: fixed window per client, reported in-band
//! - **Maintenance**: one shared tick for pings and idle eviction
//!
//! # Modules
//!
//! - `auth`: token validation, issuance and encryption
//! - `sse`: client registry, subscriptions and fan-out
//! - `api`: Axum transport (SSE stream and REST endpoints)
//! - `config`: settings with environment overrides
//! - `types`: upstream state and event payloads
//! - `utils`: timestamp helpers
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use hass_bridge::auth::TokenManager;
//! use hass_bridge::config::{SseConfig, TokenConfig};
//! use hass_bridge::sse::{ChannelSink, SseManager};
//! use hass_bridge::types::EntityState;
//!
//! let tokens = Arc::new(TokenManager::new(TokenConfig::with_secret(
//!     "a-secret-that-is-at-least-32-chars!!",
//! )));
//! let token = tokens.generate_token(serde_json::json!({"sub": "panel"})).unwrap();
//! let manager = SseManager::new(SseConfig::default(), tokens);
//!
//! let (sink, mut rx) = ChannelSink::channel();
//! let client = manager.add_client(Box::new(sink), &token, "127.0.0.1").unwrap();
//! manager.subscribe_to_domain(&client.id, "light");
//! manager.broadcast_state_change(EntityState::new("light.kitchen", "on"));
//!
//! assert!(rx.try_recv().unwrap().contains("\"connection\""));
//! assert!(rx.try_recv().unwrap().contains("light.kitchen"));
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod sse;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use auth::{TokenManager, TokenRejection};
pub use config::BridgeConfig;
pub use sse::{SseManager, SseStatistics};
pub use types::{EntityState, HassEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
