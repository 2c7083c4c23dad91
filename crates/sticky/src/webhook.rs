//! Keeps every webhook-enabled sticky backed by a live platform webhook.
//!
//! The sweep is an idempotent repair loop: a record whose identity is
//! missing, revoked, or unverifiable gets a fresh webhook; healthy records
//! are left alone. Per-record failures are logged and never abort the sweep.

use std::{sync::Arc, time::Duration};

use {
    stickler_config::WebhookDefaults,
    tokio::{sync::Mutex, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use stickler_metrics::{counter, webhook as webhook_metrics};

use crate::{
    Result,
    platform::ChatPlatform,
    store::StickyStore,
    types::{StickyPatch, StickyRecord, WebhookIdentity},
};

/// Result of checking one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityStatus {
    /// The record does not use webhook delivery.
    NotRequested,
    Healthy,
    Provisioned(WebhookIdentity),
}

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub healthy: usize,
    pub provisioned: usize,
    pub failed: usize,
}

pub struct WebhookManager {
    store: Arc<dyn StickyStore>,
    platform: Arc<dyn ChatPlatform>,
    defaults: WebhookDefaults,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WebhookManager {
    pub fn new(
        store: Arc<dyn StickyStore>,
        platform: Arc<dyn ChatPlatform>,
        defaults: WebhookDefaults,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            platform,
            defaults,
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
        })
    }

    /// Run the startup sweep (if configured) and spawn the interval loop
    /// (if the interval is non-zero).
    pub async fn start(self: &Arc<Self>) {
        if self.defaults.create_on_startup {
            match self.sweep().await {
                Ok(report) => info!(?report, "startup webhook sweep complete"),
                Err(e) => warn!(error = %e, "startup webhook sweep failed"),
            }
        }

        if self.defaults.check_interval_secs == 0 {
            debug!("periodic webhook sweep disabled");
            return;
        }

        let period = Duration::from_secs(self.defaults.check_interval_secs);
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            manager.sweep_loop(period).await;
        });
        *self.handle.lock().await = Some(handle);
        info!(
            interval_secs = self.defaults.check_interval_secs,
            "webhook manager started"
        );
    }

    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().await.take()
            && let Err(e) = handle.await
        {
            debug!(error = %e, "webhook sweep task ended abnormally");
        }
        info!("webhook manager stopped");
    }

    async fn sweep_loop(self: Arc<Self>, period: Duration) {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        warn!(error = %e, "webhook sweep failed");
                    }
                },
            }
        }
    }

    /// Check every webhook-enabled record once.
    ///
    /// Only listing the records can fail; everything per record is counted
    /// in the report instead.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let records = self.store.list_all().await?;
        let mut report = SweepReport::default();

        for record in records.iter().filter(|r| r.use_webhook) {
            report.checked += 1;
            match self.ensure_identity(record).await {
                Ok(IdentityStatus::Healthy) => report.healthy += 1,
                Ok(IdentityStatus::Provisioned(_)) => report.provisioned += 1,
                Ok(IdentityStatus::NotRequested) => {},
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        channel_id = %record.channel_id,
                        error = %e,
                        "could not ensure sticky webhook"
                    );
                    #[cfg(feature = "metrics")]
                    counter!(webhook_metrics::FAILURES_TOTAL).increment(1);
                },
            }
        }

        #[cfg(feature = "metrics")]
        counter!(webhook_metrics::SWEEPS_TOTAL).increment(1);
        debug!(?report, "webhook sweep finished");
        Ok(report)
    }

    /// Verify the record's webhook and provision a new one if it is missing
    /// or cannot be confirmed.
    pub async fn ensure_identity(&self, record: &StickyRecord) -> Result<IdentityStatus> {
        if !record.use_webhook {
            return Ok(IdentityStatus::NotRequested);
        }

        if let Some(identity) = &record.webhook_identity {
            match self.platform.list_webhooks(&record.channel_id).await {
                Ok(ids) if ids.iter().any(|id| *id == identity.id) => {
                    return Ok(IdentityStatus::Healthy);
                },
                Ok(_) => {
                    info!(
                        channel_id = %record.channel_id,
                        webhook_id = %identity.id,
                        "sticky webhook no longer exists"
                    );
                },
                Err(e) => {
                    warn!(
                        channel_id = %record.channel_id,
                        error = %e,
                        "webhook lookup failed, reprovisioning"
                    );
                },
            }
        }

        self.provision(record).await.map(IdentityStatus::Provisioned)
    }

    async fn provision(&self, record: &StickyRecord) -> Result<WebhookIdentity> {
        let name = record
            .webhook_identity
            .as_ref()
            .map(|i| i.name.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.defaults.name.clone());
        let avatar_url = record
            .webhook_identity
            .as_ref()
            .and_then(|i| i.avatar_url.clone())
            .or_else(|| self.defaults.avatar_url.clone());

        let created = self
            .platform
            .create_webhook(&record.channel_id, &name)
            .await?;
        let identity = WebhookIdentity {
            id: created.id,
            token: created.token,
            name,
            avatar_url,
        };

        self.store
            .update(
                &record.channel_id,
                StickyPatch::webhook_identity(identity.clone()),
            )
            .await?;

        info!(
            channel_id = %record.channel_id,
            webhook_id = %identity.id,
            "provisioned sticky webhook"
        );
        #[cfg(feature = "metrics")]
        counter!(webhook_metrics::PROVISIONED_TOTAL).increment(1);
        Ok(identity)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            store_memory::InMemoryStore,
            test_support::{Call, RecordingPlatform},
            types::StickyCreate,
        },
    };

    struct Fixture {
        store: Arc<InMemoryStore>,
        platform: Arc<RecordingPlatform>,
        manager: Arc<WebhookManager>,
    }

    fn fixture(defaults: WebhookDefaults) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let platform = Arc::new(RecordingPlatform::new());
        let manager = WebhookManager::new(store.clone(), platform.clone(), defaults);
        Fixture {
            store,
            platform,
            manager,
        }
    }

    async fn seed(store: &InMemoryStore, channel: &str, use_webhook: bool) {
        store
            .create(StickyCreate {
                channel_id: channel.into(),
                message: "hi".into(),
                use_webhook,
            })
            .await
            .unwrap();
    }

    fn creates(platform: &RecordingPlatform) -> usize {
        platform.count(|c| matches!(c, Call::CreateWebhook { .. }))
    }

    #[tokio::test]
    async fn missing_identity_is_provisioned_once() {
        let f = fixture(WebhookDefaults::default());
        seed(&f.store, "c1", true).await;
        seed(&f.store, "c2", false).await;

        let report = f.manager.sweep().await.unwrap();
        assert_eq!(report, SweepReport {
            checked: 1,
            healthy: 0,
            provisioned: 1,
            failed: 0,
        });
        assert_eq!(creates(&f.platform), 1);

        let identity = f
            .store
            .get("c1")
            .await
            .unwrap()
            .unwrap()
            .webhook_identity
            .unwrap();
        assert_eq!(identity.token, format!("token-{}", identity.id));
        assert_eq!(identity.name, "Sticky Messages");
        assert!(f.store.get("c2").await.unwrap().unwrap().webhook_identity.is_none());
    }

    #[tokio::test]
    async fn second_sweep_is_a_no_op() {
        let f = fixture(WebhookDefaults::default());
        seed(&f.store, "c1", true).await;

        f.manager.sweep().await.unwrap();
        let report = f.manager.sweep().await.unwrap();
        assert_eq!(report.healthy, 1);
        assert_eq!(report.provisioned, 0);
        assert_eq!(creates(&f.platform), 1);
    }

    #[tokio::test]
    async fn revoked_webhook_is_replaced_keeping_name() {
        let f = fixture(WebhookDefaults::default());
        seed(&f.store, "c1", true).await;
        f.store
            .update(
                "c1",
                StickyPatch::webhook_identity(WebhookIdentity {
                    id: "old".into(),
                    token: "t".into(),
                    name: "Rules Bot".into(),
                    avatar_url: Some("https://cdn.example/a.png".into()),
                }),
            )
            .await
            .unwrap();

        let status = f
            .manager
            .ensure_identity(&f.store.get("c1").await.unwrap().unwrap())
            .await
            .unwrap();
        let IdentityStatus::Provisioned(identity) = status else {
            panic!("expected reprovision");
        };
        assert_ne!(identity.id, "old");
        assert_eq!(identity.name, "Rules Bot");
        assert_eq!(identity.avatar_url.as_deref(), Some("https://cdn.example/a.png"));
        assert!(f.platform.calls().contains(&Call::CreateWebhook {
            channel_id: "c1".into(),
            name: "Rules Bot".into(),
        }));
    }

    #[tokio::test]
    async fn lookup_failure_reprovisions() {
        let f = fixture(WebhookDefaults::default());
        seed(&f.store, "c1", true).await;
        f.manager.sweep().await.unwrap();

        f.platform.fail("list_webhooks");
        let report = f.manager.sweep().await.unwrap();
        assert_eq!(report.provisioned, 1);
        assert_eq!(creates(&f.platform), 2);
    }

    #[tokio::test]
    async fn creation_failure_is_counted_not_raised() {
        let f = fixture(WebhookDefaults::default());
        seed(&f.store, "c1", true).await;
        seed(&f.store, "c2", true).await;
        f.platform.fail("create_webhook");

        let report = f.manager.sweep().await.unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.failed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_loop_sweeps_until_stopped() {
        let f = fixture(WebhookDefaults {
            create_on_startup: false,
            check_interval_secs: 60,
            ..WebhookDefaults::default()
        });
        f.manager.start().await;
        seed(&f.store, "c1", true).await;
        assert_eq!(creates(&f.platform), 0);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(creates(&f.platform), 1);

        f.manager.stop().await;
        f.platform.revoke_webhooks("c1");
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(creates(&f.platform), 1);
    }

    #[tokio::test]
    async fn startup_sweep_runs_inline() {
        let f = fixture(WebhookDefaults {
            check_interval_secs: 0,
            ..WebhookDefaults::default()
        });
        seed(&f.store, "c1", true).await;
        f.manager.start().await;
        assert_eq!(creates(&f.platform), 1);
        f.manager.stop().await;
    }
}
