//! Core data types for sticky records and the payloads posted for them.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A platform webhook provisioned for one channel.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookIdentity {
    pub id: String,
    pub token: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl std::fmt::Debug for WebhookIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookIdentity")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .field("name", &self.name)
            .field("avatar_url", &self.avatar_url)
            .finish()
    }
}

/// Persisted per-channel sticky state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StickyRecord {
    pub channel_id: String,
    pub message: String,
    /// Messages seen since the last repost.
    pub msg_count: u64,
    /// Id of the currently posted sticky message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    pub use_webhook: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_identity: Option<WebhookIdentity>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Fields for creating a record.
#[derive(Debug, Clone)]
pub struct StickyCreate {
    pub channel_id: String,
    pub message: String,
    pub use_webhook: bool,
}

impl StickyCreate {
    pub(crate) fn into_record(self, now: u64) -> StickyRecord {
        StickyRecord {
            channel_id: self.channel_id,
            message: self.message,
            msg_count: 0,
            artifact_id: None,
            use_webhook: self.use_webhook,
            webhook_identity: None,
            created_at_ms: now,
            updated_at_ms: now,
        }
    }
}

/// How a patch changes `msg_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountChange {
    Increment,
    Reset,
}

/// Partial update applied atomically by a store.
///
/// `Some(None)` on the nested options clears the field.
#[derive(Debug, Clone, Default)]
pub struct StickyPatch {
    pub message: Option<String>,
    pub msg_count: Option<CountChange>,
    pub artifact_id: Option<Option<String>>,
    pub use_webhook: Option<bool>,
    pub webhook_identity: Option<Option<WebhookIdentity>>,
}

impl StickyPatch {
    /// Count one more inbound message.
    #[must_use]
    pub fn increment() -> Self {
        Self {
            msg_count: Some(CountChange::Increment),
            ..Default::default()
        }
    }

    /// A new artifact was posted: remember it and restart the count.
    #[must_use]
    pub fn reposted(artifact_id: impl Into<String>) -> Self {
        Self {
            msg_count: Some(CountChange::Reset),
            artifact_id: Some(Some(artifact_id.into())),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn webhook_identity(identity: WebhookIdentity) -> Self {
        Self {
            webhook_identity: Some(Some(identity)),
            ..Default::default()
        }
    }

    pub fn apply(self, record: &mut StickyRecord, now: u64) {
        if let Some(message) = self.message {
            record.message = message;
        }
        match self.msg_count {
            Some(CountChange::Increment) => record.msg_count = record.msg_count.saturating_add(1),
            Some(CountChange::Reset) => record.msg_count = 0,
            None => {},
        }
        if let Some(artifact_id) = self.artifact_id {
            record.artifact_id = artifact_id;
        }
        if let Some(use_webhook) = self.use_webhook {
            record.use_webhook = use_webhook;
        }
        if let Some(identity) = self.webhook_identity {
            record.webhook_identity = identity;
        }
        record.updated_at_ms = now;
    }
}

/// Normalize owner-authored sticky text.
///
/// CRLF/CR become LF, the literal two-character sequence `\n` (what people
/// type into a single-line command option) becomes a newline, and the result
/// is trimmed.
#[must_use]
pub fn normalize_message(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace("\\n", "\n")
        .trim()
        .to_string()
}

/// Rich embed rendering of a sticky.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedPayload {
    pub title: Option<String>,
    pub description: String,
    pub color: Option<u32>,
    pub footer: Option<String>,
    pub thumbnail_url: Option<String>,
    pub timestamp: bool,
}

/// What gets posted for a sticky.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StickyPayload {
    Text { content: String },
    Embed(EmbedPayload),
}

impl StickyPayload {
    /// The sticky body carried by this payload.
    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            Self::Text { content } => content,
            Self::Embed(embed) => &embed.description,
        }
    }
}

/// A message from recent channel history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentMessage {
    pub id: String,
    pub content: String,
    pub embed_descriptions: Vec<String>,
    /// Posted by a bot account or a webhook.
    pub from_bot: bool,
}

impl RecentMessage {
    /// Whether this message carries `body` as its text or as an embed body.
    #[must_use]
    pub fn carries_body(&self, body: &str) -> bool {
        self.content.trim() == body || self.embed_descriptions.iter().any(|d| d.trim() == body)
    }
}

/// Credentials of a freshly created platform webhook.
#[derive(Clone, PartialEq, Eq)]
pub struct CreatedWebhook {
    pub id: String,
    pub token: String,
}

impl std::fmt::Debug for CreatedWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedWebhook")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// An inbound channel message as seen by the activity tracker.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub channel_id: String,
    /// `None` for direct messages.
    pub guild_id: Option<String>,
    pub author_id: String,
    /// Set when the message was posted through a webhook.
    pub webhook_id: Option<String>,
    /// Authored by this bot's own account.
    pub from_self: bool,
}
