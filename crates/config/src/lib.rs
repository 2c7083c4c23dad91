//! Configuration loading, validation, and env substitution.
//!
//! Config files: `stickler.toml`, `stickler.yaml`, or `stickler.json`
//! Searched in `./` then `~/.config/stickler/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{TOKEN_ENV_VAR, apply_env_overrides, config_dir, data_dir, discover_and_load},
    schema::{
        DiscordConfig, EmbedConfig, MetricsConfig, StickerConfig, StickyConfig, StorageBackend,
        StorageConfig, UpdateCheckConfig, WebhookDefaults,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
