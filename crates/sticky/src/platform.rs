//! Chat platform abstraction used by the engine.

use async_trait::async_trait;

use crate::{
    Result,
    types::{CreatedWebhook, RecentMessage, StickyPayload, WebhookIdentity},
};

/// The subset of a chat platform API the sticky engine needs.
///
/// Ids are opaque strings. Implementations map their own failures to
/// [`crate::Error::Platform`].
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Post directly into the channel. Returns the new message id.
    async fn send_message(&self, channel_id: &str, payload: &StickyPayload) -> Result<String>;

    /// Delete a message. Deleting an already-missing message is not an error.
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()>;

    /// Most recent messages in the channel, newest first.
    async fn fetch_recent_messages(&self, channel_id: &str, limit: u8)
    -> Result<Vec<RecentMessage>>;

    async fn create_webhook(&self, channel_id: &str, name: &str) -> Result<CreatedWebhook>;

    /// Ids of the webhooks currently attached to the channel.
    async fn list_webhooks(&self, channel_id: &str) -> Result<Vec<String>>;

    /// Execute a webhook. Returns the new message id.
    async fn send_via_webhook(
        &self,
        identity: &WebhookIdentity,
        payload: &StickyPayload,
    ) -> Result<String>;
}
