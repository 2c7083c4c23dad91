use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::StickerConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "stickler.toml",
    "stickler.yaml",
    "stickler.yml",
    "stickler.json",
];

/// Environment variable that overrides `discord.token`.
pub const TOKEN_ENV_VAR: &str = "STICKLER_DISCORD_TOKEN";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<StickerConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `explicit`, when given (a failure to load it is an error)
/// 2. `./stickler.{toml,yaml,yml,json}` (project-local)
/// 3. `~/.config/stickler/stickler.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `StickerConfig::default()` when nothing is found or a
/// discovered file fails to parse. Env overrides are applied last.
pub fn discover_and_load(explicit: Option<&Path>) -> anyhow::Result<StickerConfig> {
    let mut config = if let Some(path) = explicit {
        debug!(path = %path.display(), "loading explicit config");
        load_config(path)?
    } else if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                StickerConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        StickerConfig::default()
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Apply environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut StickerConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(token) = lookup(TOKEN_ENV_VAR).filter(|t| !t.trim().is_empty()) {
        config.discord.token = Secret::new(token);
    }
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/stickler/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "stickler").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory used for the default store location.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "stickler")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".stickler"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<StickerConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
