//! Per-address failed validation ledger
//!
//! Tracks how many validations from one source address failed and when the
//! last one happened. An address is locked out once it reaches the configured
//! threshold and stays locked until the lockout window has passed since its
//! last failed attempt.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::utils::elapsed_ms;

/// Failure count and time of the most recent failure for one address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttemptRecord {
    pub count: u32,
    pub last_attempt_ms: i64,
}

/// Thread-safe failed attempt ledger keyed by source address
pub struct FailedAttemptLedger {
    records: Mutex<HashMap<String, FailedAttemptRecord>>,
    max_attempts: u32,
    lockout_ms: u64,
}

impl FailedAttemptLedger {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            max_attempts,
            lockout_ms: lockout.as_millis() as u64,
        }
    }

    /// Check whether `address` is currently locked out.
    ///
    /// A record whose lockout window has elapsed is dropped on the way.
    pub fn is_locked_out(&self, address: &str, now_ms: i64) -> bool {
        let mut records = self.records.lock();
        let Some(record) = records.get(address).copied() else {
            return false;
        };

        if elapsed_ms(record.last_attempt_ms, now_ms) >= self.lockout_ms {
            records.remove(address);
            return false;
        }

        record.count >= self.max_attempts
    }

    /// Record one failed attempt, returning the new count
    pub fn record_failure(&self, address: &str, now_ms: i64) -> u32 {
        let mut records = self.records.lock();
        let record = records
            .entry(address.to_string())
            .or_insert(FailedAttemptRecord {
                count: 0,
                last_attempt_ms: now_ms,
            });

        if elapsed_ms(record.last_attempt_ms, now_ms) >= self.lockout_ms {
            record.count = 0;
        }
        record.count += 1;
        record.last_attempt_ms = now_ms;
        record.count
    }

    /// Forget all failures for `address`
    pub fn clear(&self, address: &str) {
        self.records.lock().remove(address);
    }

    /// Current failure count for `address`
    pub fn attempts(&self, address: &str) -> u32 {
        self.records
            .lock()
            .get(address)
            .map(|r| r.count)
            .unwrap_or(0)
    }

    /// Drop every record whose lockout window has elapsed
    pub fn prune(&self, now_ms: i64) -> usize {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, r| elapsed_ms(r.last_attempt_ms, now_ms) < self.lockout_ms);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
