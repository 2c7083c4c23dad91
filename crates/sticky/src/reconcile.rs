//! Threshold decision and the delete-old / post-new cycle.

use std::sync::Arc;

use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
use stickler_metrics::{counter, histogram, sticky as sticky_metrics};

use crate::{
    Error, Result,
    platform::ChatPlatform,
    render::{DispatchPath, Dispatcher},
    store::StickyStore,
    types::{StickyPatch, StickyRecord},
};

/// What one reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Count below threshold, nothing posted.
    BelowThreshold { count: u64, threshold: u64 },
    /// A new artifact was posted and persisted.
    Reposted {
        artifact_id: String,
        path: DispatchPath,
    },
    /// The record was deleted while the new artifact was in flight. The
    /// artifact has been removed again.
    Abandoned { artifact_id: String },
}

pub struct Reconciler {
    store: Arc<dyn StickyStore>,
    platform: Arc<dyn ChatPlatform>,
    dispatcher: Dispatcher,
    max_messages: u64,
    history_scan_limit: u8,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn StickyStore>,
        platform: Arc<dyn ChatPlatform>,
        dispatcher: Dispatcher,
        max_messages: u64,
        history_scan_limit: u8,
    ) -> Self {
        Self {
            store,
            platform,
            dispatcher,
            max_messages: max_messages.max(1),
            history_scan_limit,
        }
    }

    /// Repost threshold, never below one.
    pub fn max_messages(&self) -> u64 {
        self.max_messages
    }

    /// Repost when `record.msg_count` has reached the threshold.
    ///
    /// Dispatch failure is returned as-is and leaves the record untouched.
    pub async fn reconcile(&self, record: &StickyRecord) -> Result<ReconcileOutcome> {
        if record.msg_count < self.max_messages {
            debug!(
                channel_id = %record.channel_id,
                count = record.msg_count,
                threshold = self.max_messages,
                "below repost threshold"
            );
            return Ok(ReconcileOutcome::BelowThreshold {
                count: record.msg_count,
                threshold: self.max_messages,
            });
        }
        self.publish(Some(record), record).await
    }

    /// Remove whatever `previous` left in the channel, post `record`, and
    /// persist the new artifact id with a reset count.
    ///
    /// `previous` is `None` for a brand-new record, which skips the removal
    /// step entirely.
    pub async fn publish(
        &self,
        previous: Option<&StickyRecord>,
        record: &StickyRecord,
    ) -> Result<ReconcileOutcome> {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        if let Some(previous) = previous {
            self.remove_previous(previous).await;
        }

        let dispatched = self.dispatcher.dispatch(record).await?;

        match self
            .store
            .update(
                &record.channel_id,
                StickyPatch::reposted(&dispatched.artifact_id),
            )
            .await
        {
            Ok(_) => {
                info!(
                    channel_id = %record.channel_id,
                    artifact_id = %dispatched.artifact_id,
                    path = %dispatched.path,
                    "sticky reposted"
                );
                #[cfg(feature = "metrics")]
                histogram!(sticky_metrics::REPOST_DURATION_SECONDS)
                    .record(started.elapsed().as_secs_f64());
                Ok(ReconcileOutcome::Reposted {
                    artifact_id: dispatched.artifact_id,
                    path: dispatched.path,
                })
            },
            Err(Error::NotFound { .. }) => {
                info!(
                    channel_id = %record.channel_id,
                    artifact_id = %dispatched.artifact_id,
                    "sticky deleted during repost, removing new message"
                );
                self.delete_quietly(&record.channel_id, &dispatched.artifact_id)
                    .await;
                Ok(ReconcileOutcome::Abandoned {
                    artifact_id: dispatched.artifact_id,
                })
            },
            Err(e) => {
                warn!(
                    channel_id = %record.channel_id,
                    error = %e,
                    "failed to persist repost, removing new message"
                );
                self.delete_quietly(&record.channel_id, &dispatched.artifact_id)
                    .await;
                Err(e)
            },
        }
    }

    /// Best-effort removal of the artifact a record left behind.
    ///
    /// Uses the stored artifact id when there is one, otherwise scans recent
    /// bot-authored history for a message carrying the sticky body.
    pub async fn remove_previous(&self, previous: &StickyRecord) {
        match &previous.artifact_id {
            Some(artifact_id) => {
                self.delete_quietly(&previous.channel_id, artifact_id).await;
            },
            None => {
                if let Err(e) = self.remove_by_content(previous).await {
                    debug!(
                        channel_id = %previous.channel_id,
                        error = %e,
                        "history scan for previous sticky failed"
                    );
                }
            },
        }
    }

    async fn remove_by_content(&self, previous: &StickyRecord) -> Result<Option<String>> {
        if self.history_scan_limit == 0 {
            return Ok(None);
        }
        let recent = self
            .platform
            .fetch_recent_messages(&previous.channel_id, self.history_scan_limit)
            .await?;

        for message in recent
            .iter()
            .filter(|m| m.from_bot && m.carries_body(&previous.message))
        {
            match self
                .platform
                .delete_message(&previous.channel_id, &message.id)
                .await
            {
                Ok(()) => {
                    debug!(
                        channel_id = %previous.channel_id,
                        message_id = %message.id,
                        "removed previous sticky found in history"
                    );
                    #[cfg(feature = "metrics")]
                    counter!(sticky_metrics::HISTORY_SCAN_DELETES_TOTAL).increment(1);
                    return Ok(Some(message.id.clone()));
                },
                Err(e) => {
                    debug!(
                        channel_id = %previous.channel_id,
                        message_id = %message.id,
                        error = %e,
                        "could not delete history match"
                    );
                },
            }
        }
        Ok(None)
    }

    pub(crate) async fn delete_quietly(&self, channel_id: &str, message_id: &str) {
        if let Err(e) = self.platform.delete_message(channel_id, message_id).await {
            debug!(channel_id, message_id, error = %e, "failed to delete sticky message");
        }
    }
}
