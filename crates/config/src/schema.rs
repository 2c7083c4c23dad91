/// Config schema types (discord, sticky, storage, update check, metrics).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StickerConfig {
    pub discord: DiscordConfig,
    pub sticky: StickyConfig,
    pub storage: StorageConfig,
    pub update_check: UpdateCheckConfig,
    pub metrics: MetricsConfig,
}

/// Discord bot credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token from the Discord developer portal.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,
}

impl DiscordConfig {
    /// Whether a non-empty token has been configured.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Sticky message behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StickyConfig {
    /// Master switch. When false, inbound messages are ignored.
    pub enabled: bool,
    /// Number of channel messages after which the sticky is reposted.
    pub max_messages: u64,
    /// Debounce window between reconciliation attempts for one channel (ms).
    pub slowmode_delay_ms: u64,
    /// Post stickies as rich embeds instead of plain text.
    pub enable_embeds: bool,
    /// How many recent messages the content-match fallback scans when a
    /// record has no stored artifact id.
    pub history_scan_limit: u8,
    /// Post the sticky immediately when it is created or edited.
    pub post_on_create: bool,
    pub embed: EmbedConfig,
    pub webhook: WebhookDefaults,
}

impl Default for StickyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_messages: 5,
            slowmode_delay_ms: 1_000,
            enable_embeds: true,
            history_scan_limit: 50,
            post_on_create: true,
            embed: EmbedConfig::default(),
            webhook: WebhookDefaults::default(),
        }
    }
}

/// Embed presentation, applied to every channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub title: Option<String>,
    /// Hex color such as `#5865F2`.
    pub color: Option<String>,
    pub footer: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Stamp the embed with the time it was posted.
    pub timestamp: bool,
}

impl EmbedConfig {
    /// Parse [`Self::color`] into an RGB integer. Returns `None` when unset or
    /// malformed.
    #[must_use]
    pub fn color_value(&self) -> Option<u32> {
        self.color.as_deref().and_then(parse_hex_color)
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            title: Some("📌 Sticky Message".into()),
            color: Some("#5865F2".into()),
            footer: None,
            thumbnail_url: None,
            timestamp: false,
        }
    }
}

/// Parse `#RRGGBB`, `RRGGBB` or `0xRRGGBB` into an integer.
#[must_use]
pub fn parse_hex_color(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .unwrap_or(trimmed);
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Defaults for provisioned webhook identities and the health sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookDefaults {
    pub name: String,
    pub avatar_url: Option<String>,
    /// Run one sweep when the process starts.
    pub create_on_startup: bool,
    /// Seconds between sweeps. Zero disables the periodic sweep.
    pub check_interval_secs: u64,
}

impl Default for WebhookDefaults {
    fn default() -> Self {
        Self {
            name: "Sticky Messages".into(),
            avatar_url: None,
            create_on_startup: true,
            check_interval_secs: 300,
        }
    }
}

/// Which persistence backend holds sticky records.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database or JSON file path. Defaults to a file in the data directory.
    pub path: Option<PathBuf>,
}

/// Remote release registry check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateCheckConfig {
    pub enabled: bool,
    /// URL returning a JSON document with a `version` field.
    pub registry_url: String,
    /// Per-attempt request timeout.
    pub timeout_secs: u64,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Base delay for linear backoff between attempts.
    pub retry_delay_ms: u64,
}

impl Default for UpdateCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            registry_url: "https://registry.npmjs.org/stickler/latest".into(),
            timeout_secs: 10,
            max_retries: 3,
            retry_delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Address for the Prometheus scrape endpoint, e.g. `127.0.0.1:9464`.
    pub listen: Option<String>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn defaults_match_documented_values() {
        let cfg = StickerConfig::default();
        assert!(cfg.sticky.enabled);
        assert_eq!(cfg.sticky.max_messages, 5);
        assert_eq!(cfg.sticky.slowmode_delay_ms, 1_000);
        assert_eq!(cfg.sticky.webhook.check_interval_secs, 300);
        assert_eq!(cfg.storage.backend, StorageBackend::Sqlite);
        assert!(!cfg.discord.has_token());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: StickerConfig = toml::from_str(
            r#"
            [sticky]
            max_messages = 10

            [sticky.webhook]
            name = "Pinboard"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.sticky.max_messages, 10);
        assert_eq!(cfg.sticky.webhook.name, "Pinboard");
        assert!(cfg.sticky.webhook.create_on_startup);
        assert!(cfg.sticky.enable_embeds);
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = DiscordConfig {
            token: Secret::new("super-secret".into()),
        };
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn storage_backend_parses_lowercase() {
        let cfg: StorageConfig = serde_json::from_str(r#"{"backend":"file"}"#).unwrap();
        assert_eq!(cfg.backend, StorageBackend::File);
    }

    #[rstest]
    #[case("#5865F2", Some(0x5865F2))]
    #[case("5865f2", Some(0x5865F2))]
    #[case("0xff0000", Some(0xFF0000))]
    #[case("#fff", None)]
    #[case("purple", None)]
    fn hex_colors(#[case] raw: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_hex_color(raw), expected);
    }
}
