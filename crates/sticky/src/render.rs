//! Turning a sticky record into a payload and delivering it.

use std::{fmt, sync::Arc};

use {stickler_config::StickyConfig, tracing::warn};

#[cfg(feature = "metrics")]
use stickler_metrics::{counter, labels, sticky as sticky_metrics};

use crate::{
    Error, Result,
    platform::ChatPlatform,
    types::{EmbedPayload, StickyPayload, StickyRecord},
};

/// Longest body a plain text post can carry.
pub const MAX_TEXT_BODY_CHARS: usize = 2000;
/// Longest body an embed description can carry.
pub const MAX_EMBED_BODY_CHARS: usize = 4096;

/// Global rendering options, the same for every channel.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub enable_embeds: bool,
    pub title: Option<String>,
    pub color: Option<u32>,
    pub footer: Option<String>,
    pub thumbnail_url: Option<String>,
    pub timestamp: bool,
}

impl RenderSettings {
    pub fn from_config(config: &StickyConfig) -> Self {
        Self {
            enable_embeds: config.enable_embeds,
            title: config.embed.title.clone().filter(|t| !t.trim().is_empty()),
            color: config.embed.color_value(),
            footer: config.embed.footer.clone().filter(|f| !f.trim().is_empty()),
            thumbnail_url: config.embed.thumbnail_url.clone(),
            timestamp: config.embed.timestamp,
        }
    }

    /// Longest sticky body that is posted without truncation.
    pub fn max_body_chars(&self) -> usize {
        if self.enable_embeds {
            MAX_EMBED_BODY_CHARS
        } else {
            MAX_TEXT_BODY_CHARS
        }
    }

    pub fn render(&self, record: &StickyRecord) -> StickyPayload {
        if !self.enable_embeds {
            return StickyPayload::Text {
                content: record.message.clone(),
            };
        }
        StickyPayload::Embed(EmbedPayload {
            title: self.title.clone(),
            description: record.message.clone(),
            color: self.color,
            footer: self.footer.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            timestamp: self.timestamp,
        })
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from_config(&StickyConfig::default())
    }
}

/// Which delivery path produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPath {
    Webhook,
    Direct,
}

impl fmt::Display for DispatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Webhook => f.write_str("webhook"),
            Self::Direct => f.write_str("direct"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub artifact_id: String,
    pub path: DispatchPath,
}

/// Renders records and posts them, preferring the channel webhook.
pub struct Dispatcher {
    platform: Arc<dyn ChatPlatform>,
    settings: RenderSettings,
}

impl Dispatcher {
    pub fn new(platform: Arc<dyn ChatPlatform>, settings: RenderSettings) -> Self {
        Self { platform, settings }
    }

    /// Post the record's sticky body.
    ///
    /// The webhook path is tried first when the record opts in and has an
    /// identity. Any webhook error falls back to a direct post; only a direct
    /// post failure surfaces as [`Error::DispatchFailed`].
    pub async fn dispatch(&self, record: &StickyRecord) -> Result<Dispatched> {
        let payload = self.settings.render(record);

        if record.use_webhook
            && let Some(identity) = &record.webhook_identity
        {
            match self.platform.send_via_webhook(identity, &payload).await {
                Ok(artifact_id) => {
                    #[cfg(feature = "metrics")]
                    counter!(sticky_metrics::REPOSTS_TOTAL, labels::PATH => "webhook").increment(1);
                    return Ok(Dispatched {
                        artifact_id,
                        path: DispatchPath::Webhook,
                    });
                },
                Err(e) => {
                    warn!(
                        channel_id = %record.channel_id,
                        webhook_id = %identity.id,
                        error = %e,
                        "webhook send failed, falling back to direct post"
                    );
                    #[cfg(feature = "metrics")]
                    counter!(sticky_metrics::WEBHOOK_FALLBACKS_TOTAL).increment(1);
                },
            }
        }

        match self.platform.send_message(&record.channel_id, &payload).await {
            Ok(artifact_id) => {
                #[cfg(feature = "metrics")]
                counter!(sticky_metrics::REPOSTS_TOTAL, labels::PATH => "direct").increment(1);
                Ok(Dispatched {
                    artifact_id,
                    path: DispatchPath::Direct,
                })
            },
            Err(e) => {
                #[cfg(feature = "metrics")]
                counter!(sticky_metrics::DISPATCH_FAILURES_TOTAL).increment(1);
                Err(Error::dispatch_failed(&record.channel_id, e))
            },
        }
    }
}
