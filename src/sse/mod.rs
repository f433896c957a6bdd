//! Real-time push channel
//!
//! Clients register with a bearer token, subscribe to entities, domains or
//! event types, and receive JSON frames through their sink.
//!
//! ## Modules
//! - `manager`: registry, subscriptions and fan-out
//! - `client`: per-client subscriptions and rate limiting
//! - `cache`: bounded last-known entity states
//! - `frame`: wire frames
//! - `sink`: delivery abstraction
//! - `maintenance`: shared ping / eviction tick
//! - `stats`: registry statistics

pub mod cache;
pub mod client;
pub mod frame;
pub mod maintenance;
pub mod manager;
pub mod sink;
pub mod stats;

pub use client::{ClientInfo, SubscriptionKind, SubscriptionSummary};
pub use frame::{SseFrame, RATE_LIMIT_EXCEEDED};
pub use maintenance::{MaintenanceHandle, MaintenanceReport};
pub use manager::SseManager;
pub use sink::{ChannelSink, ClientSink, SinkError};
pub use stats::{ConnectionAgeBuckets, SseStatistics};

use std::sync::Arc;

/// Thread-safe wrapper for SseManager
pub type SharedSseManager = Arc<SseManager>;
