//! [`ChatPlatform`] over serenity's HTTP client.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serenity::{
        all::{ChannelId, MessageId, WebhookId},
        builder::{CreateWebhook, GetMessages},
        http::{Http, HttpError},
    },
    tracing::debug,
};

use stickler_sticky::{
    ChatPlatform, Error as StickyError, Result,
    types::{CreatedWebhook, RecentMessage, StickyPayload, WebhookIdentity},
};

use crate::payload;

/// Discord REST client used by the sticky engine.
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn parse_id(raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| StickyError::invalid_input(format!("not a discord id: {raw}")))
}

fn channel(raw: &str) -> Result<ChannelId> {
    parse_id(raw).map(ChannelId::new)
}

fn is_not_found(err: &serenity::Error) -> bool {
    matches!(
        err,
        serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) if resp.status_code.as_u16() == 404
    )
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn send_message(&self, channel_id: &str, payload: &StickyPayload) -> Result<String> {
        let message = channel(channel_id)?
            .send_message(&*self.http, payload::create_message(payload))
            .await
            .map_err(|e| StickyError::platform("send message", e))?;
        Ok(message.id.to_string())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        let message = MessageId::new(parse_id(message_id)?);
        match channel(channel_id)?
            .delete_message(&*self.http, message)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(channel_id, message_id, "message already gone");
                Ok(())
            },
            Err(e) => Err(StickyError::platform("delete message", e)),
        }
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<RecentMessage>> {
        let messages = channel(channel_id)?
            .messages(&*self.http, GetMessages::new().limit(limit.clamp(1, 100)))
            .await
            .map_err(|e| StickyError::platform("fetch recent messages", e))?;
        Ok(messages.iter().map(payload::recent_message).collect())
    }

    async fn create_webhook(&self, channel_id: &str, name: &str) -> Result<CreatedWebhook> {
        let webhook = channel(channel_id)?
            .create_webhook(&*self.http, CreateWebhook::new(name))
            .await
            .map_err(|e| StickyError::platform("create webhook", e))?;
        let url = webhook
            .url()
            .map_err(|e| StickyError::platform("read webhook token", e))?;
        let token = payload::token_from_url(&url).ok_or_else(|| {
            StickyError::platform(
                "read webhook token",
                std::io::Error::other("webhook url carries no token"),
            )
        })?;
        Ok(CreatedWebhook {
            id: webhook.id.to_string(),
            token: token.to_string(),
        })
    }

    async fn list_webhooks(&self, channel_id: &str) -> Result<Vec<String>> {
        let webhooks = channel(channel_id)?
            .webhooks(&*self.http)
            .await
            .map_err(|e| StickyError::platform("list webhooks", e))?;
        Ok(webhooks.iter().map(|w| w.id.to_string()).collect())
    }

    async fn send_via_webhook(
        &self,
        identity: &WebhookIdentity,
        payload: &StickyPayload,
    ) -> Result<String> {
        let webhook_id = WebhookId::new(parse_id(&identity.id)?);
        let builder = payload::execute_webhook(identity, payload);
        let message = self
            .http
            .execute_webhook(webhook_id, None, &identity.token, true, Vec::new(), &builder)
            .await
            .map_err(|e| StickyError::platform("execute webhook", e))?;
        message.map(|m| m.id.to_string()).ok_or_else(|| {
            StickyError::platform(
                "execute webhook",
                std::io::Error::other("discord returned no message for a waited webhook"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_nonzero_integers() {
        assert_eq!(parse_id("1234567890").ok(), Some(1_234_567_890));
        assert!(parse_id("0").is_err());
        assert!(parse_id("c1").is_err());
        assert!(parse_id("").is_err());
    }
}
