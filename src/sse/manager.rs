//! Client registry and event fan-out
//!
//! The manager owns every registered [`Client`] and the last-known state
//! cache behind one lock. Public calls, the maintenance tick and the HTTP
//! layer all go through that lock, and sinks are invoked while it is held so
//! each client sees its frames in order.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::cache::EntityStateCache;
use super::client::{
    Client, ClientInfo, Delivery, RateLimit, SubscriptionKind, Subscriptions,
};
use super::frame::{SseFrame, RATE_LIMIT_EXCEEDED};
use super::maintenance::MaintenanceReport;
use super::sink::{ClientSink, SinkError};
use super::stats::SseStatistics;
use crate::auth::SharedTokenManager;
use crate::config::SseConfig;
use crate::types::{EntityState, HassEvent};
use crate::utils::{current_timestamp_ms, elapsed_ms, to_rfc3339};

struct Registry {
    clients: HashMap<String, Client>,
    cache: EntityStateCache,
}

impl Registry {
    fn drop_client(&mut self, client_id: &str, reason: &str) {
        if self.clients.remove(client_id).is_some() {
            info!(client_id, reason, remaining = self.clients.len(), "client removed");
        }
    }
}

fn new_client_id() -> String {
    format!("sse_{}", Uuid::new_v4().simple())
}

fn encode(frame: &SseFrame) -> Option<String> {
    match frame.to_json() {
        Ok(payload) => Some(payload),
        Err(e) => {
            error!(error = %e, "failed to serialize frame");
            None
        }
    }
}

/// Registry of push channel clients
pub struct SseManager {
    registry: Mutex<Registry>,
    tokens: SharedTokenManager,
    config: SseConfig,
}

impl SseManager {
    pub fn new(config: SseConfig, tokens: SharedTokenManager) -> Self {
        Self {
            registry: Mutex::new(Registry {
                clients: HashMap::new(),
                cache: EntityStateCache::new(config.max_cached_entities),
            }),
            tokens,
            config,
        }
    }

    pub fn config(&self) -> &SseConfig {
        &self.config
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            max_messages: self.config.max_messages_per_window,
            window_ms: self.config.rate_limit_window.as_millis() as u64,
        }
    }

    fn rate_limit_payload(now_ms: i64) -> String {
        encode(&SseFrame::error(RATE_LIMIT_EXCEEDED, to_rfc3339(now_ms))).unwrap_or_default()
    }

    fn dispatch(
        &self,
        client: &mut Client,
        frame: &SseFrame,
        now_ms: i64,
    ) -> Result<Delivery, SinkError> {
        let Some(payload) = encode(frame) else {
            return Ok(Delivery::Suppressed);
        };
        client.deliver(
            &payload,
            &Self::rate_limit_payload(now_ms),
            now_ms,
            self.rate_limit(),
        )
    }

    /// Register a client.
    ///
    /// Returns `None` when the registry is full, when the first frame cannot
    /// be delivered, or (with `reject_unauthenticated`) when the token is
    /// refused. Otherwise the client is registered with `authenticated` set
    /// from the token check, and that flag never changes afterwards.
    pub fn add_client(
        &self,
        sink: Box<dyn ClientSink>,
        token: &str,
        source_address: &str,
    ) -> Option<ClientInfo> {
        if self.client_count() >= self.config.max_clients {
            warn!(
                max_clients = self.config.max_clients,
                address = source_address,
                "client refused: registry full"
            );
            return None;
        }

        let authenticated = match self.tokens.validate_token(token, source_address) {
            Ok(_) => true,
            Err(rejection) => {
                info!(address = source_address, reason = %rejection, "client token rejected");
                false
            }
        };
        if !authenticated && self.config.reject_unauthenticated {
            return None;
        }

        let now_ms = current_timestamp_ms();
        let mut registry = self.registry.lock();
        if registry.clients.len() >= self.config.max_clients {
            warn!(address = source_address, "client refused: registry full");
            return None;
        }

        let id = new_client_id();
        let mut client = Client::new(id.clone(), sink, authenticated, source_address, now_ms);
        let hello = SseFrame::connection(&id, authenticated, to_rfc3339(now_ms));
        if let Err(e) = self.dispatch(&mut client, &hello, now_ms) {
            warn!(client_id = %id, error = %e, "client dropped before registration");
            return None;
        }

        let info = client.snapshot();
        registry.clients.insert(id, client);
        info!(
            client_id = %info.id,
            authenticated,
            address = source_address,
            total = registry.clients.len(),
            "client connected"
        );
        Some(info)
    }

    /// Deregister a client; unknown ids are ignored
    pub fn remove_client(&self, client_id: &str) -> bool {
        let mut registry = self.registry.lock();
        let removed = registry.clients.contains_key(client_id);
        registry.drop_client(client_id, "removed");
        removed
    }

    pub fn client_count(&self) -> usize {
        self.registry.lock().clients.len()
    }

    pub fn client_info(&self, client_id: &str) -> Option<ClientInfo> {
        self.registry
            .lock()
            .clients
            .get(client_id)
            .map(Client::snapshot)
    }

    /// Cached state of `entity_id`, if it was ever broadcast
    pub fn cached_state(&self, entity_id: &str) -> Option<EntityState> {
        self.registry.lock().cache.get(entity_id).cloned()
    }

    fn update_subscription(
        &self,
        client_id: &str,
        kind: SubscriptionKind,
        key: &str,
        subscribe: bool,
    ) -> bool {
        let now_ms = current_timestamp_ms();
        let mut registry = self.registry.lock();
        let Registry { clients, cache } = &mut *registry;

        let Some(client) = clients.get_mut(client_id) else {
            return false;
        };
        if !client.is_authenticated() {
            debug!(client_id, ?kind, key, "ignoring subscription change from unauthenticated client");
            return false;
        }

        if !subscribe {
            client.subscriptions.remove(kind, key);
            debug!(client_id, ?kind, key, "unsubscribed");
            return true;
        }

        client.subscriptions.insert(kind, key);
        debug!(client_id, ?kind, key, "subscribed");

        if kind == SubscriptionKind::Entity {
            if let Some(state) = cache.get(key) {
                let replay = SseFrame::state_changed(state, to_rfc3339(now_ms));
                if let Err(e) = self.dispatch(client, &replay, now_ms) {
                    warn!(client_id, error = %e, "replay failed");
                    registry.drop_client(client_id, "send failed");
                }
            }
        }
        true
    }

    /// Subscribe to one entity and replay its cached state, if any
    pub fn subscribe_to_entity(&self, client_id: &str, entity_id: &str) -> bool {
        self.update_subscription(client_id, SubscriptionKind::Entity, entity_id, true)
    }

    pub fn subscribe_to_domain(&self, client_id: &str, domain: &str) -> bool {
        self.update_subscription(client_id, SubscriptionKind::Domain, domain, true)
    }

    pub fn subscribe_to_event(&self, client_id: &str, event_type: &str) -> bool {
        self.update_subscription(client_id, SubscriptionKind::Event, event_type, true)
    }

    pub fn unsubscribe_from_entity(&self, client_id: &str, entity_id: &str) -> bool {
        self.update_subscription(client_id, SubscriptionKind::Entity, entity_id, false)
    }

    pub fn unsubscribe_from_domain(&self, client_id: &str, domain: &str) -> bool {
        self.update_subscription(client_id, SubscriptionKind::Domain, domain, false)
    }

    pub fn unsubscribe_from_event(&self, client_id: &str, event_type: &str) -> bool {
        self.update_subscription(client_id, SubscriptionKind::Event, event_type, false)
    }

    /// Deliver `frame` to every authenticated client whose subscriptions match.
    /// Clients whose sink fails are removed; the rest of the batch is unaffected.
    fn fan_out<F>(&self, registry: &mut Registry, frame: &SseFrame, now_ms: i64, matches: F) -> usize
    where
        F: Fn(&Subscriptions) -> bool,
    {
        let Some(payload) = encode(frame) else {
            return 0;
        };
        let error_payload = Self::rate_limit_payload(now_ms);
        let limit = self.rate_limit();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for client in registry.clients.values_mut() {
            if !client.is_authenticated() || !matches(&client.subscriptions) {
                continue;
            }
            match client.deliver(&payload, &error_payload, now_ms, limit) {
                Ok(Delivery::Sent) => delivered += 1,
                Ok(Delivery::RateLimited) => {
                    debug!(client_id = client.id(), "rate limit reached")
                }
                Ok(Delivery::Suppressed) => {}
                Err(e) => {
                    warn!(client_id = client.id(), error = %e, "send failed");
                    dead.push(client.id().to_string());
                }
            }
        }

        for id in dead {
            registry.drop_client(&id, "send failed");
        }
        delivered
    }

    /// Cache `state` and push it to entity, domain and `state_changed` subscribers
    pub fn broadcast_state_change(&self, state: EntityState) -> usize {
        let now_ms = current_timestamp_ms();
        let frame = SseFrame::state_changed(&state, to_rfc3339(now_ms));
        let entity_id = state.entity_id.clone();

        let mut registry = self.registry.lock();
        let evicted = registry.cache.insert(state);
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted stale entity states");
        }

        self.fan_out(&mut registry, &frame, now_ms, |subs| {
            subs.matches_state_change(&entity_id)
        })
    }

    /// Push `event` to clients subscribed to its event type
    pub fn broadcast_event(&self, event: &HassEvent) -> usize {
        let now_ms = current_timestamp_ms();
        let frame = SseFrame::event(event, to_rfc3339(now_ms));

        let mut registry = self.registry.lock();
        self.fan_out(&mut registry, &frame, now_ms, |subs| {
            subs.matches_event(&event.event_type)
        })
    }

    pub fn broadcast_service_call(&self, domain: &str, service: &str, data: Value) -> usize {
        self.broadcast_event(&HassEvent::service_call(domain, service, data))
    }

    pub fn broadcast_automation_triggered(&self, automation_id: &str, trigger: Value) -> usize {
        self.broadcast_event(&HassEvent::automation_triggered(automation_id, trigger))
    }

    pub fn broadcast_script_executed(&self, script_id: &str, data: Value) -> usize {
        self.broadcast_event(&HassEvent::script_executed(script_id, data))
    }

    /// Send one frame to one client, subject to its rate limit.
    ///
    /// Returns false when the client is unknown, throttled, or was removed
    /// because its sink failed.
    pub fn send_to_client(&self, client_id: &str, frame: &SseFrame) -> bool {
        let now_ms = current_timestamp_ms();
        let mut registry = self.registry.lock();
        let Some(client) = registry.clients.get_mut(client_id) else {
            return false;
        };

        match self.dispatch(client, frame, now_ms) {
            Ok(delivery) => delivery == Delivery::Sent,
            Err(e) => {
                warn!(client_id, error = %e, "send failed");
                registry.drop_client(client_id, "send failed");
                false
            }
        }
    }

    pub fn get_statistics(&self) -> SseStatistics {
        let now_ms = current_timestamp_ms();
        let registry = self.registry.lock();
        SseStatistics::collect(registry.clients.values(), registry.cache.len(), now_ms)
    }

    /// One maintenance sweep: evict idle clients, reset elapsed rate-limit
    /// windows, ping clients that are due and prune the failed attempt ledger.
    pub fn run_maintenance(&self) -> MaintenanceReport {
        let now_ms = current_timestamp_ms();
        let timeout_ms = self.config.client_timeout.as_millis() as u64;
        let ping_ms = self.config.ping_interval.as_millis() as u64;
        let limit = self.rate_limit();
        let mut report = MaintenanceReport::default();

        {
            let mut registry = self.registry.lock();
            let ping = encode(&SseFrame::ping(to_rfc3339(now_ms))).unwrap_or_default();
            let error_payload = Self::rate_limit_payload(now_ms);

            let mut idle = Vec::new();
            let mut dead = Vec::new();
            for client in registry.clients.values_mut() {
                if elapsed_ms(client.last_activity_ms, now_ms) > timeout_ms {
                    idle.push(client.id().to_string());
                    continue;
                }

                if client.rate_limit.roll_window(now_ms, limit) {
                    report.windows_reset += 1;
                }

                if elapsed_ms(client.last_ping_ms, now_ms) >= ping_ms {
                    client.last_ping_ms = now_ms;
                    match client.deliver(&ping, &error_payload, now_ms, limit) {
                        Ok(Delivery::Sent) => report.pings_sent += 1,
                        Ok(_) => {}
                        Err(e) => {
                            warn!(client_id = client.id(), error = %e, "ping failed");
                            dead.push(client.id().to_string());
                        }
                    }
                }
            }

            report.timed_out = idle.len();
            report.send_failures = dead.len();
            for id in idle {
                registry.drop_client(&id, "idle timeout");
            }
            for id in dead {
                registry.drop_client(&id, "send failed");
            }
        }

        report.failed_attempts_pruned = self.tokens.prune_failed_attempts();
        if report.timed_out + report.send_failures + report.failed_attempts_pruned > 0 {
            debug!(?report, "maintenance sweep");
        }
        report
    }
}
