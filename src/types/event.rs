//! Platform events forwarded to subscribers

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::utils::{current_timestamp_ms, to_rfc3339};

/// Event type of state change notifications
pub const STATE_CHANGED: &str = "state_changed";
/// Event type used for service calls
pub const CALL_SERVICE: &str = "call_service";
/// Event type used when an automation fires
pub const AUTOMATION_TRIGGERED: &str = "automation_triggered";
/// Event type used when a script runs
pub const SCRIPT_EXECUTED: &str = "script_executed";

fn default_origin() -> String {
    "LOCAL".to_string()
}

/// Event as emitted by the upstream platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HassEvent {
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default)]
    pub time_fired: String,
    #[serde(default)]
    pub context: Value,
}

impl HassEvent {
    /// Local event fired now with an empty context
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            origin: default_origin(),
            time_fired: to_rfc3339(current_timestamp_ms()),
            context: json!({}),
        }
    }

    pub fn service_call(domain: &str, service: &str, service_data: Value) -> Self {
        Self::new(
            CALL_SERVICE,
            json!({
                "domain": domain,
                "service": service,
                "service_data": service_data,
            }),
        )
    }

    pub fn automation_triggered(automation_id: &str, trigger: Value) -> Self {
        Self::new(
            AUTOMATION_TRIGGERED,
            json!({
                "automation_id": automation_id,
                "trigger": trigger,
            }),
        )
    }

    pub fn script_executed(script_id: &str, data: Value) -> Self {
        Self::new(
            SCRIPT_EXECUTED,
            json!({
                "script_id": script_id,
                "execution_data": data,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_on_deserialize() {
        let event: HassEvent = serde_json::from_value(json!({"event_type": "zha_event"})).unwrap();
        assert_eq!(event.origin, "LOCAL");
        assert!(event.data.is_null());
    }

    #[test]
    fn test_service_call_shape() {
        let event = HassEvent::service_call("light", "turn_on", json!({"entity_id": "light.hall"}));
        assert_eq!(event.event_type, CALL_SERVICE);
        assert_eq!(event.data["service"], "turn_on");
        assert_eq!(event.data["service_data"]["entity_id"], "light.hall");
        assert!(!event.time_fired.is_empty());
    }
}
