//! Registry statistics

use serde::Serialize;

use super::client::{Client, SubscriptionSummary};
use crate::utils::elapsed_ms;

const MINUTE_MS: u64 = 60 * 1000;

/// Clients grouped by how long they have been connected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionAgeBuckets {
    pub less_than_1m: usize,
    pub less_than_5m: usize,
    pub less_than_1h: usize,
    pub more_than_1h: usize,
}

impl ConnectionAgeBuckets {
    pub fn record(&mut self, age_ms: u64) {
        if age_ms < MINUTE_MS {
            self.less_than_1m += 1;
        } else if age_ms < 5 * MINUTE_MS {
            self.less_than_5m += 1;
        } else if age_ms < 60 * MINUTE_MS {
            self.less_than_1h += 1;
        } else {
            self.more_than_1h += 1;
        }
    }
}

/// Snapshot returned by `SseManager::get_statistics`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SseStatistics {
    pub total_clients: usize,
    pub authenticated_clients: usize,
    pub total_subscriptions: usize,
    pub clients_by_connection_time: ConnectionAgeBuckets,
    pub total_entities_tracked: usize,
    pub subscriptions: SubscriptionSummary,
}

impl SseStatistics {
    pub fn collect<'a, I>(clients: I, entities_tracked: usize, now_ms: i64) -> Self
    where
        I: Iterator<Item = &'a Client> + Clone,
    {
        let mut stats = Self {
            total_entities_tracked: entities_tracked,
            ..Self::default()
        };

        for client in clients.clone() {
            stats.total_clients += 1;
            if client.is_authenticated() {
                stats.authenticated_clients += 1;
            }
            stats.total_subscriptions += client.subscriptions.len();
            stats
                .clients_by_connection_time
                .record(elapsed_ms(client.connected_at_ms, now_ms));
        }

        let all = clients.map(|c| &c.subscriptions);
        stats.subscriptions = SubscriptionSummary::from_sets(
            all.clone().flat_map(|s| &s.entities),
            all.clone().flat_map(|s| &s.events),
            all.flat_map(|s| &s.domains),
        );
        stats
    }
}
