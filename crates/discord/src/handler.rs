//! Discord event handler for serenity.
//!
//! Feeds guild messages to the sticky engine and routes `/sticky` commands.

use std::sync::{Arc, OnceLock};

use {
    serenity::{
        all::{
            Command, CommandInteraction, Context, CreateInteractionResponse,
            CreateInteractionResponseMessage, EventHandler, GatewayIntents, Interaction, Message,
            Ready,
        },
        async_trait,
    },
    tracing::{debug, info, warn},
};

use stickler_sticky::{CommandReply, StickyService, types::InboundMessage};

use crate::{
    commands::{self, COMMAND_NAME, StickyCommand},
    payload::{MAX_CONTENT_LEN, truncate},
};

/// Handler for Discord gateway events.
pub struct StickerHandler {
    service: Arc<StickyService>,
    bot_user_id: OnceLock<u64>,
}

impl StickerHandler {
    pub fn new(service: Arc<StickyService>) -> Self {
        Self {
            service,
            bot_user_id: OnceLock::new(),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }

    fn inbound(&self, msg: &Message) -> InboundMessage {
        let author_id = msg.author.id.get();
        InboundMessage {
            channel_id: msg.channel_id.to_string(),
            guild_id: msg.guild_id.map(|g| g.to_string()),
            author_id: author_id.to_string(),
            webhook_id: msg.webhook_id.map(|w| w.to_string()),
            from_self: self.bot_user_id.get() == Some(&author_id),
        }
    }

    async fn run_command(&self, command: &CommandInteraction) -> CommandReply {
        if command.guild_id.is_none() {
            return CommandReply {
                success: false,
                message: "Sticky messages only work in server channels.".into(),
            };
        }
        match StickyCommand::from_interaction(command) {
            Ok(parsed) => {
                info!(
                    channel_id = %command.channel_id,
                    user_id = %command.user.id,
                    command = ?parsed,
                    "sticky command"
                );
                commands::execute(&self.service, &command.channel_id.to_string(), parsed).await
            },
            Err(reason) => CommandReply {
                success: false,
                message: reason,
            },
        }
    }
}

#[async_trait]
impl EventHandler for StickerHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );

        let _ = self.bot_user_id.set(ready.user.id.get());

        if let Err(e) = Command::create_global_command(&ctx.http, commands::definition()).await {
            warn!(error = %e, "failed to register /{COMMAND_NAME} command");
        }
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let inbound = self.inbound(&msg);
        match self.service.handle_message(&inbound).await {
            Ok(outcome) => {
                debug!(channel_id = %inbound.channel_id, ?outcome, "message tracked");
            },
            Err(e) => {
                warn!(channel_id = %inbound.channel_id, error = %e, "sticky reconcile failed");
            },
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        if command.data.name != COMMAND_NAME {
            return;
        }

        let reply = self.run_command(&command).await;
        let response = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(truncate(&reply.message, MAX_CONTENT_LEN))
                .ephemeral(true),
        );
        if let Err(e) = command.create_response(&ctx.http, response).await {
            warn!(error = %e, "failed to answer sticky command");
        }
    }
}
