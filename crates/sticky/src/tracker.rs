//! Counts inbound channel traffic and triggers reconciliation.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use {tokio::time::Instant, tracing::debug};

#[cfg(feature = "metrics")]
use stickler_metrics::{counter, sticky as sticky_metrics};

use crate::{
    Error, Result,
    debounce::DebounceGate,
    reconcile::{ReconcileOutcome, Reconciler},
    store::StickyStore,
    types::{InboundMessage, StickyPatch},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Authored by this bot or delivered through the channel's sticky webhook.
    OwnMessage,
    /// Not in a guild channel.
    NoGuild,
    /// The channel has no sticky.
    NoSticky,
    /// Sticky handling is switched off.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Ignored(IgnoreReason),
    /// Counted, but the channel is inside its debounce window.
    Debounced { count: u64 },
    Reconciled(ReconcileOutcome),
}

/// Debounce windows plus the channels with a reconcile still running.
struct Gates {
    debounce: DebounceGate,
    in_flight: HashSet<String>,
}

pub struct ActivityTracker {
    store: Arc<dyn StickyStore>,
    reconciler: Arc<Reconciler>,
    gates: Mutex<Gates>,
}

/// Clears the channel's in-flight mark when the reconcile finishes.
struct InFlight<'a> {
    gates: &'a Mutex<Gates>,
    channel_id: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        gates.in_flight.remove(self.channel_id);
    }
}

impl ActivityTracker {
    pub fn new(
        store: Arc<dyn StickyStore>,
        reconciler: Arc<Reconciler>,
        debounce_window: Duration,
    ) -> Self {
        Self {
            store,
            reconciler,
            gates: Mutex::new(Gates {
                debounce: DebounceGate::new(debounce_window),
                in_flight: HashSet::new(),
            }),
        }
    }

    /// Count one inbound message and reconcile if the debounce gate allows.
    ///
    /// The increment is persisted before the gate is consulted, so debounced
    /// messages still count toward the next repost. At most one reconcile
    /// runs per channel; a message arriving while one is in flight is
    /// reported as debounced even when its window has passed.
    pub async fn on_message(&self, message: &InboundMessage) -> Result<TrackOutcome> {
        if message.from_self {
            return Ok(TrackOutcome::Ignored(IgnoreReason::OwnMessage));
        }
        if message.guild_id.is_none() {
            return Ok(TrackOutcome::Ignored(IgnoreReason::NoGuild));
        }

        let Some(record) = self.store.get(&message.channel_id).await? else {
            return Ok(TrackOutcome::Ignored(IgnoreReason::NoSticky));
        };

        if let (Some(webhook_id), Some(identity)) = (&message.webhook_id, &record.webhook_identity)
            && *webhook_id == identity.id
        {
            return Ok(TrackOutcome::Ignored(IgnoreReason::OwnMessage));
        }

        let record = match self
            .store
            .update(&message.channel_id, StickyPatch::increment())
            .await
        {
            Ok(record) => record,
            Err(Error::NotFound { .. }) => {
                return Ok(TrackOutcome::Ignored(IgnoreReason::NoSticky));
            },
            Err(e) => return Err(e),
        };

        #[cfg(feature = "metrics")]
        counter!(sticky_metrics::MESSAGES_TRACKED_TOTAL).increment(1);

        let acquired = {
            let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
            let free = !gates.in_flight.contains(&message.channel_id)
                && gates.debounce.try_acquire(&message.channel_id, Instant::now());
            if free {
                gates.in_flight.insert(message.channel_id.clone());
            }
            free
        };
        if !acquired {
            debug!(
                channel_id = %message.channel_id,
                count = record.msg_count,
                "reconcile debounced"
            );
            #[cfg(feature = "metrics")]
            counter!(sticky_metrics::DEBOUNCED_TOTAL).increment(1);
            return Ok(TrackOutcome::Debounced {
                count: record.msg_count,
            });
        }

        let _in_flight = InFlight {
            gates: &self.gates,
            channel_id: &message.channel_id,
        };
        self.reconciler
            .reconcile(&record)
            .await
            .map(TrackOutcome::Reconciled)
    }
}
