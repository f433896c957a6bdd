//! Frames pushed to SSE clients
//!
//! Every frame serializes to a JSON object with a `type` field. Control
//! frames use fixed types; forwarded platform events use their own event type.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{EntityState, HassEvent};

/// Error code sent once per window when a client exceeds its rate limit
pub const RATE_LIMIT_EXCEEDED: &str = "rate_limit_exceeded";

/// Frames with a fixed `type`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    /// Sent once right after registration
    Connection {
        status: &'static str,
        client_id: String,
        authenticated: bool,
        timestamp: String,
    },
    /// Keep-alive
    Ping { timestamp: String },
    /// Entity state update or cache replay
    StateChanged {
        data: StateChangedData,
        timestamp: String,
    },
    /// In-band error notification
    Error { error: String, timestamp: String },
}

/// Payload of a `state_changed` frame
#[derive(Debug, Clone, Serialize)]
pub struct StateChangedData {
    pub entity_id: String,
    pub state: String,
    pub attributes: Map<String, Value>,
    pub last_changed: String,
    pub last_updated: String,
}

impl From<&EntityState> for StateChangedData {
    fn from(state: &EntityState) -> Self {
        Self {
            entity_id: state.entity_id.clone(),
            state: state.state.clone(),
            attributes: state.attributes.clone(),
            last_changed: state.last_changed.clone(),
            last_updated: state.last_updated.clone(),
        }
    }
}

/// Forwarded platform event; `type` is the event type itself
#[derive(Debug, Clone, Serialize)]
pub struct EventFrame {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub origin: String,
    pub time_fired: String,
    pub context: Value,
    pub timestamp: String,
}

/// Any frame deliverable to a client
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SseFrame {
    Control(ControlFrame),
    Event(EventFrame),
}

impl SseFrame {
    pub fn connection(client_id: &str, authenticated: bool, timestamp: String) -> Self {
        SseFrame::Control(ControlFrame::Connection {
            status: "connected",
            client_id: client_id.to_string(),
            authenticated,
            timestamp,
        })
    }

    pub fn ping(timestamp: String) -> Self {
        SseFrame::Control(ControlFrame::Ping { timestamp })
    }

    pub fn state_changed(state: &EntityState, timestamp: String) -> Self {
        SseFrame::Control(ControlFrame::StateChanged {
            data: StateChangedData::from(state),
            timestamp,
        })
    }

    pub fn error(code: &str, timestamp: String) -> Self {
        SseFrame::Control(ControlFrame::Error {
            error: code.to_string(),
            timestamp,
        })
    }

    pub fn event(event: &HassEvent, timestamp: String) -> Self {
        SseFrame::Event(EventFrame {
            event_type: event.event_type.clone(),
            data: event.data.clone(),
            origin: event.origin.clone(),
            time_fired: event.time_fired.clone(),
            context: event.context.clone(),
            timestamp,
        })
    }

    /// Serialize for the wire
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
