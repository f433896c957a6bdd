//! Utility functions and helpers
//!
//! This module contains timestamp utilities shared by the auth and SSE layers.

pub mod time;

pub use time::{current_timestamp, current_timestamp_ms, elapsed_ms, to_rfc3339};
