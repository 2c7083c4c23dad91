//! Mapping sticky payloads onto serenity builders.

use serenity::{
    all::{Message, Timestamp},
    builder::{CreateEmbed, CreateEmbedFooter, CreateMessage, ExecuteWebhook},
};

use stickler_sticky::types::{EmbedPayload, RecentMessage, StickyPayload, WebhookIdentity};

/// Discord's limit for plain message content, in characters.
pub const MAX_CONTENT_LEN: usize = 2000;
pub const MAX_EMBED_DESCRIPTION_LEN: usize = 4096;
pub const MAX_EMBED_TITLE_LEN: usize = 256;
pub const MAX_EMBED_FOOTER_LEN: usize = 2048;

/// Cut `s` to at most `max_chars` characters, never splitting a character.
pub fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

pub fn build_embed(embed: &EmbedPayload) -> CreateEmbed {
    let mut builder =
        CreateEmbed::new().description(truncate(&embed.description, MAX_EMBED_DESCRIPTION_LEN));
    if let Some(title) = &embed.title {
        builder = builder.title(truncate(title, MAX_EMBED_TITLE_LEN));
    }
    if let Some(color) = embed.color {
        builder = builder.color(color);
    }
    if let Some(footer) = &embed.footer {
        builder = builder.footer(CreateEmbedFooter::new(truncate(
            footer,
            MAX_EMBED_FOOTER_LEN,
        )));
    }
    if let Some(url) = &embed.thumbnail_url {
        builder = builder.thumbnail(url);
    }
    if embed.timestamp {
        builder = builder.timestamp(Timestamp::now());
    }
    builder
}

pub fn create_message(payload: &StickyPayload) -> CreateMessage {
    match payload {
        StickyPayload::Text { content } => {
            CreateMessage::new().content(truncate(content, MAX_CONTENT_LEN))
        },
        StickyPayload::Embed(embed) => CreateMessage::new().embed(build_embed(embed)),
    }
}

/// Webhook execution carrying the identity's name and avatar as overrides.
pub fn execute_webhook(identity: &WebhookIdentity, payload: &StickyPayload) -> ExecuteWebhook {
    let mut builder = match payload {
        StickyPayload::Text { content } => {
            ExecuteWebhook::new().content(truncate(content, MAX_CONTENT_LEN))
        },
        StickyPayload::Embed(embed) => ExecuteWebhook::new().embed(build_embed(embed)),
    };
    if !identity.name.is_empty() {
        builder = builder.username(&identity.name);
    }
    if let Some(avatar_url) = &identity.avatar_url {
        builder = builder.avatar_url(avatar_url);
    }
    builder
}

pub fn recent_message(message: &Message) -> RecentMessage {
    RecentMessage {
        id: message.id.to_string(),
        content: message.content.clone(),
        embed_descriptions: message
            .embeds
            .iter()
            .filter_map(|e| e.description.clone())
            .collect(),
        from_bot: message.author.bot || message.webhook_id.is_some(),
    }
}

/// Extract the token from a webhook URL (`.../webhooks/{id}/{token}`).
pub fn token_from_url(url: &str) -> Option<&str> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|t| !t.is_empty() && !t.contains(':'))
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("short", 10, "short")]
    #[case("exactly", 7, "exactly")]
    #[case("abcdef", 3, "abc")]
    #[case("ééé", 2, "éé")]
    #[case("", 5, "")]
    fn truncates_on_char_boundaries(
        #[case] input: &str,
        #[case] max: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(truncate(input, max), expected);
    }

    #[test]
    fn long_content_fits_discord_limit() {
        let long = "x".repeat(MAX_CONTENT_LEN + 50);
        assert_eq!(truncate(&long, MAX_CONTENT_LEN).chars().count(), MAX_CONTENT_LEN);
    }

    #[rstest]
    #[case("https://discord.com/api/webhooks/123/abcDEF-ghi", Some("abcDEF-ghi"))]
    #[case("https://discord.com/api/webhooks/123/tok/", Some("tok"))]
    #[case("https:", None)]
    fn webhook_token_from_url(#[case] url: &str, #[case] expected: Option<&str>) {
        assert_eq!(token_from_url(url), expected);
    }
}
