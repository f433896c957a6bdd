//! Entity state snapshots pushed by the upstream platform

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Last known state of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub last_changed: String,
    #[serde(default)]
    pub last_updated: String,
}

impl EntityState {
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Map::new(),
            last_changed: String::new(),
            last_updated: String::new(),
        }
    }

    /// Set an attribute (builder style)
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Domain of this entity, e.g. `light` for `light.kitchen`
    pub fn domain(&self) -> &str {
        domain_of(&self.entity_id)
    }
}

/// Text before the first `.` of an entity id, or the whole id when there is none
pub fn domain_of(entity_id: &str) -> &str {
    entity_id
        .split_once('.')
        .map(|(domain, _)| domain)
        .unwrap_or(entity_id)
}
