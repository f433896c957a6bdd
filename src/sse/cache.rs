//! Last-known entity states
//!
//! Holds the most recent state per entity so a new subscriber can be brought
//! up to date immediately. The cache is bounded: once it grows past its
//! capacity the entity updated least recently is evicted.

use std::collections::{BTreeMap, HashMap};

use crate::types::EntityState;

struct CachedState {
    state: EntityState,
    seq: u64,
}

/// Bounded map of entity id to last broadcast state
pub struct EntityStateCache {
    entries: HashMap<String, CachedState>,
    /// Update sequence -> entity id, oldest first
    order: BTreeMap<u64, String>,
    next_seq: u64,
    capacity: usize,
}

impl EntityStateCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            capacity: capacity.max(1),
        }
    }

    /// Store `state`, evicting the stalest entries past capacity
    pub fn insert(&mut self, state: EntityState) -> Vec<String> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let entity_id = state.entity_id.clone();
        if let Some(previous) = self.entries.insert(entity_id.clone(), CachedState { state, seq }) {
            self.order.remove(&previous.seq);
        }
        self.order.insert(seq, entity_id);

        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            evicted.push(oldest);
        }
        evicted
    }

    pub fn get(&self, entity_id: &str) -> Option<&EntityState> {
        self.entries.get(entity_id).map(|c| &c.state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
