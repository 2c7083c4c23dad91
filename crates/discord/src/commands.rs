//! The `/sticky` slash command.

use serenity::{
    all::{
        CommandInteraction, CommandOptionType, Permissions, ResolvedOption, ResolvedValue,
    },
    builder::{CreateCommand, CreateCommandOption},
};

use stickler_sticky::{
    CommandReply, Error, StickyService, render::MAX_EMBED_BODY_CHARS, types::StickyRecord,
};

use crate::payload::{MAX_CONTENT_LEN, truncate};

pub const COMMAND_NAME: &str = "sticky";

/// Upper bound Discord enforces on the `message` option. The service applies
/// the tighter limit of the configured post format.
const MESSAGE_MAX_LEN: u16 = MAX_EMBED_BODY_CHARS as u16;

/// Definition registered with Discord on `ready`.
pub fn definition() -> CreateCommand {
    CreateCommand::new(COMMAND_NAME)
        .description("Manage this channel's sticky message")
        .default_member_permissions(Permissions::MANAGE_MESSAGES)
        .dm_permission(false)
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "create",
                "Create a sticky message in this channel",
            )
            .add_sub_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "message",
                    "Sticky text (use \\n for a new line)",
                )
                .required(true)
                .max_length(MESSAGE_MAX_LEN),
            )
            .add_sub_option(CreateCommandOption::new(
                CommandOptionType::Boolean,
                "webhook",
                "Post through a channel webhook",
            )),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "edit",
                "Change this channel's sticky text",
            )
            .add_sub_option(
                CreateCommandOption::new(CommandOptionType::String, "message", "New sticky text")
                    .required(true)
                    .max_length(MESSAGE_MAX_LEN),
            ),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "delete",
            "Remove this channel's sticky message",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "list",
            "List every sticky message",
        ))
}

/// A parsed `/sticky` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StickyCommand {
    Create { message: String, use_webhook: bool },
    Edit { message: String },
    Delete,
    List,
}

impl StickyCommand {
    /// Build from a subcommand name and its option values.
    pub fn from_parts(
        subcommand: &str,
        message: Option<&str>,
        webhook: Option<bool>,
    ) -> Result<Self, String> {
        let require_message = || {
            message
                .map(str::to_string)
                .ok_or_else(|| format!("`/{COMMAND_NAME} {subcommand}` needs a message"))
        };
        match subcommand {
            "create" => Ok(Self::Create {
                message: require_message()?,
                use_webhook: webhook.unwrap_or(false),
            }),
            "edit" => Ok(Self::Edit {
                message: require_message()?,
            }),
            "delete" => Ok(Self::Delete),
            "list" => Ok(Self::List),
            other => Err(format!("unknown subcommand `{other}`")),
        }
    }

    pub fn from_interaction(command: &CommandInteraction) -> Result<Self, String> {
        let options = command.data.options();
        let Some(ResolvedOption {
            name,
            value: ResolvedValue::SubCommand(sub_options),
            ..
        }) = options.first()
        else {
            return Err("missing subcommand".into());
        };

        let mut message = None;
        let mut webhook = None;
        for option in sub_options {
            match (option.name, &option.value) {
                ("message", ResolvedValue::String(text)) => message = Some(*text),
                ("webhook", ResolvedValue::Boolean(flag)) => webhook = Some(*flag),
                _ => {},
            }
        }
        Self::from_parts(name, message, webhook)
    }
}

/// Run a parsed command for `channel_id`.
pub async fn execute(
    service: &StickyService,
    channel_id: &str,
    command: StickyCommand,
) -> CommandReply {
    match command {
        StickyCommand::Create {
            message,
            use_webhook,
        } => match service
            .create_sticky(channel_id, &message, use_webhook)
            .await
        {
            Ok(record) if record.artifact_id.is_some() || !service.posts_on_create() => {
                CommandReply::ok("Sticky message created.")
            },
            Ok(_) => CommandReply::ok(
                "Sticky message saved, but I could not post it yet. Check my permissions in this channel.",
            ),
            Err(e) => CommandReply::failed(&e),
        },
        StickyCommand::Edit { message } => match service.edit_sticky(channel_id, &message).await {
            Ok(_) => CommandReply::ok("Sticky message updated."),
            Err(e) => CommandReply::failed(&e),
        },
        StickyCommand::Delete => match service.delete_sticky(channel_id).await {
            Ok(Some(_)) => CommandReply::ok("Sticky message deleted."),
            Ok(None) => CommandReply::failed(&Error::not_found(channel_id)),
            Err(e) => CommandReply::failed(&e),
        },
        StickyCommand::List => match service.list_stickies().await {
            Ok(records) => CommandReply::ok(format_list(&records)),
            Err(e) => CommandReply::failed(&e),
        },
    }
}

/// Preview width for each sticky in `/sticky list`.
const PREVIEW_LEN: usize = 60;

pub fn format_list(records: &[StickyRecord]) -> String {
    if records.is_empty() {
        return "No sticky messages are configured.".into();
    }
    let mut out = format!("**Sticky messages ({})**\n", records.len());
    for record in records {
        let first_line = record.message.lines().next().unwrap_or_default();
        let mut preview = truncate(first_line, PREVIEW_LEN).to_string();
        if preview.len() < record.message.len() {
            preview.push('…');
        }
        let via = if record.use_webhook {
            " (webhook)"
        } else {
            ""
        };
        out.push_str(&format!(
            "<#{}>{via}: {preview} [{} msgs]\n",
            record.channel_id, record.msg_count
        ));
    }
    truncate(out.trim_end(), MAX_CONTENT_LEN).to_string()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        assert_eq!(
            StickyCommand::from_parts("create", Some("hi"), None),
            Ok(StickyCommand::Create {
                message: "hi".into(),
                use_webhook: false
            })
        );
        assert_eq!(
            StickyCommand::from_parts("create", Some("hi"), Some(true)),
            Ok(StickyCommand::Create {
                message: "hi".into(),
                use_webhook: true
            })
        );
        assert_eq!(
            StickyCommand::from_parts("edit", Some("new"), None),
            Ok(StickyCommand::Edit {
                message: "new".into()
            })
        );
        assert_eq!(
            StickyCommand::from_parts("delete", None, None),
            Ok(StickyCommand::Delete)
        );
        assert_eq!(StickyCommand::from_parts("list", None, None), Ok(StickyCommand::List));
    }

    #[test]
    fn missing_message_and_unknown_subcommand() {
        assert!(
            StickyCommand::from_parts("create", None, None)
                .unwrap_err()
                .contains("needs a message")
        );
        assert!(StickyCommand::from_parts("purge", None, None).is_err());
    }

    fn record(channel: &str, message: &str, use_webhook: bool) -> StickyRecord {
        StickyRecord {
            channel_id: channel.into(),
            message: message.into(),
            msg_count: 2,
            artifact_id: None,
            use_webhook,
            webhook_identity: None,
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    #[test]
    fn list_formatting() {
        assert_eq!(format_list(&[]), "No sticky messages are configured.");

        let text = format_list(&[
            record("1", "Rules\nsecond line", false),
            record("2", &"y".repeat(100), true),
        ]);
        assert!(text.starts_with("**Sticky messages (2)**"));
        assert!(text.contains("<#1>: Rules… [2 msgs]"));
        assert!(text.contains("<#2> (webhook): "));
        assert!(text.contains(&format!("{}…", "y".repeat(PREVIEW_LEN))));
    }
}
