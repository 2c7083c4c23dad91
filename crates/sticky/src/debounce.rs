//! Per-channel debounce gate for reconciliation attempts.

use std::{collections::HashMap, time::Duration};

use tokio::time::Instant;

/// Entries kept before expired ones are pruned on insert.
const PRUNE_THRESHOLD: usize = 1024;

/// Records, per channel, the earliest time the next reconciliation may run.
#[derive(Debug)]
pub struct DebounceGate {
    window: Duration,
    next_eligible: HashMap<String, Instant>,
}

impl DebounceGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            next_eligible: HashMap::new(),
        }
    }

    pub fn is_eligible(&self, channel_id: &str, now: Instant) -> bool {
        self.next_eligible
            .get(channel_id)
            .is_none_or(|eligible| now >= *eligible)
    }

    pub fn mark_dispatched(&mut self, channel_id: &str, now: Instant) {
        if self.next_eligible.len() >= PRUNE_THRESHOLD {
            self.prune(now);
        }
        self.next_eligible
            .insert(channel_id.to_string(), now + self.window);
    }

    /// Check and mark in one step. Returns `false` while the channel is
    /// still inside its window.
    pub fn try_acquire(&mut self, channel_id: &str, now: Instant) -> bool {
        if !self.is_eligible(channel_id, now) {
            return false;
        }
        self.mark_dispatched(channel_id, now);
        true
    }

    /// Drop entries whose window has passed.
    pub fn prune(&mut self, now: Instant) {
        self.next_eligible.retain(|_, eligible| *eligible > now);
    }

    pub fn len(&self) -> usize {
        self.next_eligible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_eligible.is_empty()
    }
}
