//! Registered client state

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::sink::{ClientSink, SinkError};
use crate::types::domain_of;
use crate::types::event::STATE_CHANGED;
use crate::utils::elapsed_ms;

/// Which subscription set an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    Entity,
    Domain,
    Event,
}

/// The three subscription sets of one client
#[derive(Debug, Clone, Default)]
pub struct Subscriptions {
    pub entities: HashSet<String>,
    pub domains: HashSet<String>,
    pub events: HashSet<String>,
}

impl Subscriptions {
    fn set_mut(&mut self, kind: SubscriptionKind) -> &mut HashSet<String> {
        match kind {
            SubscriptionKind::Entity => &mut self.entities,
            SubscriptionKind::Domain => &mut self.domains,
            SubscriptionKind::Event => &mut self.events,
        }
    }

    pub fn insert(&mut self, kind: SubscriptionKind, key: &str) -> bool {
        self.set_mut(kind).insert(key.to_string())
    }

    pub fn remove(&mut self, kind: SubscriptionKind, key: &str) -> bool {
        self.set_mut(kind).remove(key)
    }

    /// Sum of all three set sizes
    pub fn len(&self) -> usize {
        self.entities.len() + self.domains.len() + self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entity id, its domain, or the generic state_changed event
    pub fn matches_state_change(&self, entity_id: &str) -> bool {
        self.entities.contains(entity_id)
            || self.domains.contains(domain_of(entity_id))
            || self.events.contains(STATE_CHANGED)
    }

    pub fn matches_event(&self, event_type: &str) -> bool {
        self.events.contains(event_type)
    }
}

/// Sorted, serializable view of subscription keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionSummary {
    pub entities: Vec<String>,
    pub events: Vec<String>,
    pub domains: Vec<String>,
}

impl SubscriptionSummary {
    pub fn from_sets<'a>(
        entities: impl IntoIterator<Item = &'a String>,
        events: impl IntoIterator<Item = &'a String>,
        domains: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        let sorted =
            |keys: BTreeSet<&'a String>| -> Vec<String> { keys.into_iter().cloned().collect() };
        Self {
            entities: sorted(entities.into_iter().collect()),
            events: sorted(events.into_iter().collect()),
            domains: sorted(domains.into_iter().collect()),
        }
    }
}

impl From<&Subscriptions> for SubscriptionSummary {
    fn from(subs: &Subscriptions) -> Self {
        Self::from_sets(&subs.entities, &subs.events, &subs.domains)
    }
}

/// Per-window message cap
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_messages: u32,
    pub window_ms: u64,
}

/// Fixed-window counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub count: u32,
    pub window_start_ms: i64,
    /// The client already got its `rate_limit_exceeded` frame this window
    pub notified: bool,
}

/// Outcome of asking the limiter for one more message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Cap reached; notify the client once
    Exceeded,
    /// Cap reached and already notified
    Suppressed,
}

impl RateLimitState {
    pub fn new(now_ms: i64) -> Self {
        Self {
            count: 0,
            window_start_ms: now_ms,
            notified: false,
        }
    }

    /// Start a new window if the current one has elapsed
    pub fn roll_window(&mut self, now_ms: i64, limit: RateLimit) -> bool {
        if elapsed_ms(self.window_start_ms, now_ms) < limit.window_ms {
            return false;
        }
        *self = Self::new(now_ms);
        true
    }

    pub fn admit(&mut self, now_ms: i64, limit: RateLimit) -> Admission {
        self.roll_window(now_ms, limit);

        if self.count >= limit.max_messages {
            if self.notified {
                return Admission::Suppressed;
            }
            self.notified = true;
            return Admission::Exceeded;
        }

        self.count += 1;
        Admission::Allowed
    }
}

/// Result of a successful dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    RateLimited,
    Suppressed,
}

/// A connected consumer owned by the manager
pub struct Client {
    id: String,
    sink: Box<dyn ClientSink>,
    authenticated: bool,
    source_address: String,
    pub subscriptions: Subscriptions,
    pub rate_limit: RateLimitState,
    pub connected_at_ms: i64,
    pub last_activity_ms: i64,
    pub last_ping_ms: i64,
}

impl Client {
    pub fn new(
        id: String,
        sink: Box<dyn ClientSink>,
        authenticated: bool,
        source_address: &str,
        now_ms: i64,
    ) -> Self {
        Self {
            id,
            sink,
            authenticated,
            source_address: source_address.to_string(),
            subscriptions: Subscriptions::default(),
            rate_limit: RateLimitState::new(now_ms),
            connected_at_ms: now_ms,
            last_activity_ms: now_ms,
            last_ping_ms: now_ms,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Decided once at registration
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    /// Send `payload` subject to the rate limit.
    ///
    /// `error_payload` is delivered instead, once per window, when the cap is hit.
    pub fn deliver(
        &mut self,
        payload: &str,
        error_payload: &str,
        now_ms: i64,
        limit: RateLimit,
    ) -> Result<Delivery, SinkError> {
        match self.rate_limit.admit(now_ms, limit) {
            Admission::Allowed => {
                self.last_activity_ms = now_ms;
                self.sink.send(payload)?;
                Ok(Delivery::Sent)
            }
            Admission::Exceeded => {
                self.sink.send(error_payload)?;
                Ok(Delivery::RateLimited)
            }
            Admission::Suppressed => Ok(Delivery::Suppressed),
        }
    }

    pub fn snapshot(&self) -> ClientInfo {
        ClientInfo {
            id: self.id.clone(),
            authenticated: self.authenticated,
            source_address: self.source_address.clone(),
            connected_at_ms: self.connected_at_ms,
            last_activity_ms: self.last_activity_ms,
            subscriptions: SubscriptionSummary::from(&self.subscriptions),
        }
    }
}

/// Read-only copy of a client's registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    pub id: String,
    pub authenticated: bool,
    pub source_address: String,
    pub connected_at_ms: i64,
    pub last_activity_ms: i64,
    pub subscriptions: SubscriptionSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: RateLimit = RateLimit {
        max_messages: 2,
        window_ms: 1_000,
    };

    #[test]
    fn test_admit_until_cap_then_notify_once() {
        let mut state = RateLimitState::new(0);
        assert_eq!(state.admit(10, LIMIT), Admission::Allowed);
        assert_eq!(state.admit(20, LIMIT), Admission::Allowed);
        assert_eq!(state.admit(30, LIMIT), Admission::Exceeded);
        assert_eq!(state.admit(40, LIMIT), Admission::Suppressed);
        assert_eq!(state.count, 2);
    }

    #[test]
    fn test_window_rolls_once() {
        let mut state = RateLimitState::new(0);
        state.admit(0, LIMIT);
        state.admit(0, LIMIT);
        assert!(state.roll_window(1_000, LIMIT));
        assert!(!state.roll_window(1_500, LIMIT));
        assert_eq!(state.count, 0);
        assert_eq!(state.admit(1_600, LIMIT), Admission::Allowed);
    }

    #[test]
    fn test_state_change_matching() {
        let mut subs = Subscriptions::default();
        assert!(!subs.matches_state_change("light.kitchen"));

        subs.insert(SubscriptionKind::Domain, "light");
        assert!(subs.matches_state_change("light.kitchen"));
        assert!(!subs.matches_state_change("switch.fan"));

        subs.insert(SubscriptionKind::Event, STATE_CHANGED);
        assert!(subs.matches_state_change("switch.fan"));
        assert_eq!(subs.len(), 2);
    }

    #[test]
    fn test_summary_is_sorted() {
        let mut subs = Subscriptions::default();
        subs.insert(SubscriptionKind::Entity, "light.b");
        subs.insert(SubscriptionKind::Entity, "light.a");
        let summary = SubscriptionSummary::from(&subs);
        assert_eq!(summary.entities, vec!["light.a", "light.b"]);
        assert!(summary.events.is_empty());
    }
}
