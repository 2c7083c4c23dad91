//! Recording [`ChatPlatform`] fake shared by the engine tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    Error, Result,
    platform::ChatPlatform,
    types::{CreatedWebhook, RecentMessage, StickyPayload, WebhookIdentity},
};

/// One observed platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send { channel_id: String, body: String },
    Delete { channel_id: String, message_id: String },
    FetchRecent { channel_id: String, limit: u8 },
    CreateWebhook { channel_id: String, name: String },
    ListWebhooks { channel_id: String },
    SendViaWebhook { webhook_id: String, body: String },
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    next_id: u64,
    history: HashMap<String, Vec<RecentMessage>>,
    webhooks: HashMap<String, Vec<String>>,
    failing: HashSet<&'static str>,
    send_delay: Duration,
}

/// In-memory platform that records every call and can be told to fail.
#[derive(Default)]
pub struct RecordingPlatform {
    state: Mutex<State>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `op` fail (`"send"`, `"delete"`, `"fetch"`,
    /// `"create_webhook"`, `"list_webhooks"`, `"webhook_send"`).
    pub fn fail(&self, op: &'static str) {
        self.lock().failing.insert(op);
    }

    /// Make direct sends take `delay`, like a rate-limited REST call.
    pub fn set_send_delay(&self, delay: Duration) {
        self.lock().send_delay = delay;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Delete { message_id, .. } => Some(message_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Seed channel history, newest first.
    pub fn set_history(&self, channel_id: &str, messages: Vec<RecentMessage>) {
        self.lock().history.insert(channel_id.into(), messages);
    }

    /// Drop all webhooks from a channel, as if revoked by a moderator.
    pub fn revoke_webhooks(&self, channel_id: &str) {
        self.lock().webhooks.remove(channel_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(state: &State, op: &'static str) -> Result<()> {
        if state.failing.contains(op) {
            return Err(Error::platform(op, std::io::Error::other("injected failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn send_message(&self, channel_id: &str, payload: &StickyPayload) -> Result<String> {
        let delay = self.lock().send_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.lock();
        state.calls.push(Call::Send {
            channel_id: channel_id.into(),
            body: payload.body().into(),
        });
        Self::check(&state, "send")?;
        state.next_id += 1;
        Ok(format!("m{}", state.next_id))
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call::Delete {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        });
        Self::check(&state, "delete")
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<RecentMessage>> {
        let mut state = self.lock();
        state.calls.push(Call::FetchRecent {
            channel_id: channel_id.into(),
            limit,
        });
        Self::check(&state, "fetch")?;
        Ok(state
            .history
            .get(channel_id)
            .map(|h| h.iter().take(usize::from(limit)).cloned().collect())
            .unwrap_or_default())
    }

    async fn create_webhook(&self, channel_id: &str, name: &str) -> Result<CreatedWebhook> {
        let mut state = self.lock();
        state.calls.push(Call::CreateWebhook {
            channel_id: channel_id.into(),
            name: name.into(),
        });
        Self::check(&state, "create_webhook")?;
        state.next_id += 1;
        let id = format!("w{}", state.next_id);
        state
            .webhooks
            .entry(channel_id.into())
            .or_default()
            .push(id.clone());
        Ok(CreatedWebhook {
            token: format!("token-{id}"),
            id,
        })
    }

    async fn list_webhooks(&self, channel_id: &str) -> Result<Vec<String>> {
        let mut state = self.lock();
        state.calls.push(Call::ListWebhooks {
            channel_id: channel_id.into(),
        });
        Self::check(&state, "list_webhooks")?;
        Ok(state.webhooks.get(channel_id).cloned().unwrap_or_default())
    }

    async fn send_via_webhook(
        &self,
        identity: &WebhookIdentity,
        payload: &StickyPayload,
    ) -> Result<String> {
        let mut state = self.lock();
        state.calls.push(Call::SendViaWebhook {
            webhook_id: identity.id.clone(),
            body: payload.body().into(),
        });
        Self::check(&state, "webhook_send")?;
        state.next_id += 1;
        Ok(format!("m{}", state.next_id))
    }
}
