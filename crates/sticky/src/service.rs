//! Facade wiring the store, tracker, reconciler and webhook manager together.

use std::{sync::Arc, time::Duration};

use {
    stickler_config::StickyConfig,
    tracing::{info, warn},
};

#[cfg(feature = "metrics")]
use stickler_metrics::{gauge, sticky as sticky_metrics};

use crate::{
    Error, Result,
    platform::ChatPlatform,
    reconcile::{ReconcileOutcome, Reconciler},
    render::{Dispatcher, RenderSettings},
    store::StickyStore,
    tracker::{ActivityTracker, IgnoreReason, TrackOutcome},
    types::{InboundMessage, StickyCreate, StickyPatch, StickyRecord, normalize_message},
    webhook::{IdentityStatus, WebhookManager},
};

/// Reply for the command layer: success flag plus a user-facing sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub success: bool,
    pub message: String,
}

impl CommandReply {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn failed(error: &Error) -> Self {
        Self {
            success: false,
            message: error.user_reason(),
        }
    }
}

pub struct StickyService {
    store: Arc<dyn StickyStore>,
    reconciler: Arc<Reconciler>,
    tracker: ActivityTracker,
    webhooks: Arc<WebhookManager>,
    enabled: bool,
    post_on_create: bool,
    max_body_chars: usize,
}

impl StickyService {
    pub fn new(
        store: Arc<dyn StickyStore>,
        platform: Arc<dyn ChatPlatform>,
        config: &StickyConfig,
    ) -> Arc<Self> {
        let settings = RenderSettings::from_config(config);
        let max_body_chars = settings.max_body_chars();
        let dispatcher = Dispatcher::new(Arc::clone(&platform), settings);
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&platform),
            dispatcher,
            config.max_messages,
            config.history_scan_limit,
        ));
        let tracker = ActivityTracker::new(
            Arc::clone(&store),
            Arc::clone(&reconciler),
            Duration::from_millis(config.slowmode_delay_ms),
        );
        let webhooks = WebhookManager::new(
            Arc::clone(&store),
            Arc::clone(&platform),
            config.webhook.clone(),
        );

        Arc::new(Self {
            store,
            reconciler,
            tracker,
            webhooks,
            enabled: config.enabled,
            post_on_create: config.post_on_create,
            max_body_chars,
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `create_sticky` posts the sticky right away.
    pub fn posts_on_create(&self) -> bool {
        self.enabled && self.post_on_create
    }

    /// Normalize a sticky body and check it fits one post.
    fn checked_message(&self, raw: &str) -> Result<String> {
        let message = normalize_message(raw);
        if message.is_empty() {
            return Err(Error::invalid_input("sticky message cannot be empty"));
        }
        let chars = message.chars().count();
        if chars > self.max_body_chars {
            return Err(Error::invalid_input(format!(
                "sticky message is {chars} characters, the limit is {}",
                self.max_body_chars
            )));
        }
        Ok(message)
    }

    pub async fn start(&self) {
        if !self.enabled {
            info!("sticky messages disabled, not starting webhook manager");
            return;
        }
        self.webhooks.start().await;
    }

    pub async fn stop(&self) {
        self.webhooks.stop().await;
    }

    /// Create the channel's sticky and post it.
    ///
    /// Webhook provisioning and the initial post are best-effort: failures
    /// are logged and the record is kept, so the sweep and the next
    /// threshold repost can recover. While the engine is disabled the record
    /// is only stored.
    pub async fn create_sticky(
        &self,
        channel_id: &str,
        message: &str,
        use_webhook: bool,
    ) -> Result<StickyRecord> {
        let message = self.checked_message(message)?;

        let mut record = self
            .store
            .create(StickyCreate {
                channel_id: channel_id.to_string(),
                message,
                use_webhook,
            })
            .await?;
        info!(channel_id, use_webhook, "sticky created");
        self.refresh_record_gauge().await;

        if use_webhook && self.enabled {
            match self.webhooks.ensure_identity(&record).await {
                Ok(IdentityStatus::Provisioned(identity)) => {
                    record.webhook_identity = Some(identity);
                },
                Ok(_) => {},
                Err(e) => {
                    warn!(channel_id, error = %e, "webhook not provisioned yet, will retry on sweep");
                },
            }
        }

        if self.posts_on_create() {
            match self.reconciler.publish(None, &record).await {
                Ok(ReconcileOutcome::Reposted { artifact_id, .. }) => {
                    record.artifact_id = Some(artifact_id);
                    record.msg_count = 0;
                },
                Ok(_) => {},
                Err(e) => {
                    warn!(channel_id, error = %e, "initial sticky post failed");
                },
            }
        }

        Ok(record)
    }

    /// Replace the sticky text and repost immediately, unless disabled.
    pub async fn edit_sticky(&self, channel_id: &str, message: &str) -> Result<StickyRecord> {
        let message = self.checked_message(message)?;

        let previous = self
            .store
            .get(channel_id)
            .await?
            .ok_or_else(|| Error::not_found(channel_id))?;
        let updated = self
            .store
            .update(channel_id, StickyPatch::message(message))
            .await?;
        info!(channel_id, "sticky edited");
        if !self.enabled {
            return Ok(updated);
        }

        match self.reconciler.publish(Some(&previous), &updated).await? {
            ReconcileOutcome::Reposted { .. } => self
                .store
                .get(channel_id)
                .await?
                .ok_or_else(|| Error::not_found(channel_id)),
            _ => Err(Error::not_found(channel_id)),
        }
    }

    /// Remove the channel's sticky and, best-effort, its posted message.
    ///
    /// Returns `None` when the channel had no sticky.
    pub async fn delete_sticky(&self, channel_id: &str) -> Result<Option<StickyRecord>> {
        let Some(record) = self.store.delete(channel_id).await? else {
            return Ok(None);
        };
        self.reconciler.remove_previous(&record).await;
        info!(channel_id, "sticky deleted");
        self.refresh_record_gauge().await;
        Ok(Some(record))
    }

    /// All stickies, oldest first.
    pub async fn list_stickies(&self) -> Result<Vec<StickyRecord>> {
        let mut records = self.store.list_all().await?;
        records.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.channel_id.cmp(&b.channel_id))
        });
        Ok(records)
    }

    /// Feed one inbound channel message through the tracker.
    pub async fn handle_message(&self, message: &InboundMessage) -> Result<TrackOutcome> {
        if !self.enabled {
            return Ok(TrackOutcome::Ignored(IgnoreReason::Disabled));
        }
        self.tracker.on_message(message).await
    }

    #[cfg(feature = "metrics")]
    async fn refresh_record_gauge(&self) {
        if let Ok(records) = self.store.list_all().await {
            gauge!(sticky_metrics::RECORDS).set(records.len() as f64);
        }
    }

    #[cfg(not(feature = "metrics"))]
    async fn refresh_record_gauge(&self) {}
}
