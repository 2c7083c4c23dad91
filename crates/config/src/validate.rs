//! Configuration validation.
//!
//! Detects unknown/misspelled fields, type errors, and settings that parse but
//! cannot work (zero thresholds, malformed colors, a missing bot token).

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::schema::{StickerConfig, parse_hex_color};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "semantic", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "sticky.max_mesages"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Expected shape of the config tree.
enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    Struct(HashMap::from([
        ("discord", Struct(HashMap::from([("token", Leaf)]))),
        (
            "sticky",
            Struct(HashMap::from([
                ("enabled", Leaf),
                ("max_messages", Leaf),
                ("slowmode_delay_ms", Leaf),
                ("enable_embeds", Leaf),
                ("history_scan_limit", Leaf),
                ("post_on_create", Leaf),
                (
                    "embed",
                    Struct(HashMap::from([
                        ("title", Leaf),
                        ("color", Leaf),
                        ("footer", Leaf),
                        ("thumbnail_url", Leaf),
                        ("timestamp", Leaf),
                    ])),
                ),
                (
                    "webhook",
                    Struct(HashMap::from([
                        ("name", Leaf),
                        ("avatar_url", Leaf),
                        ("create_on_startup", Leaf),
                        ("check_interval_secs", Leaf),
                    ])),
                ),
            ])),
        ),
        (
            "storage",
            Struct(HashMap::from([("backend", Leaf), ("path", Leaf)])),
        ),
        (
            "update_check",
            Struct(HashMap::from([
                ("enabled", Leaf),
                ("registry_url", Leaf),
                ("timeout_secs", Leaf),
                ("max_retries", Leaf),
                ("retry_delay_ms", Leaf),
            ])),
        ),
        (
            "metrics",
            Struct(HashMap::from([("enabled", Leaf), ("listen", Leaf)])),
        ),
    ]))
}

/// Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

/// Validate a config file at `path`, or the discovered default when `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path
        .map(Path::to_path_buf)
        .or_else(crate::loader::find_config_file);

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let format = actual_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("toml")
        .to_string();

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(content) => validate_str(&crate::env_subst::substitute_env(&content), &format),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate raw config text in the given format (`toml`, `yaml`/`yml`, `json`).
#[must_use]
pub fn validate_str(raw: &str, format: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let parsed: Result<serde_json::Value, String> = match format {
        "toml" => toml::from_str::<toml::Value>(raw)
            .map_err(|e| e.to_string())
            .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str::<serde_json::Value>(raw).map_err(|e| e.to_string()),
        "json" => serde_json::from_str::<serde_json::Value>(raw).map_err(|e| e.to_string()),
        other => Err(format!("unsupported config format: .{other}")),
    };

    let value = match parsed {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("{format} syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&value, &build_schema_map(), "", &mut diagnostics);

    match serde_json::from_value::<StickerConfig>(value) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (serde_json::Value::Object(map), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known: Vec<&str> = fields.keys().copied().collect();
    for (key, child) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child, child_schema, &path, diagnostics);
            continue;
        }
        let message = match suggest(key, &known, 3) {
            Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
            None => "unknown field".to_string(),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "unknown-field",
            path,
            message,
        });
    }
}

fn check_semantics(config: &StickerConfig, diagnostics: &mut Vec<Diagnostic>) {
    let mut push = |severity, path: &str, message: String| {
        diagnostics.push(Diagnostic {
            severity,
            category: "semantic",
            path: path.into(),
            message,
        });
    };

    if config.sticky.max_messages == 0 {
        push(
            Severity::Error,
            "sticky.max_messages",
            "must be at least 1 (0 would repost on every message)".into(),
        );
    }
    if let Some(color) = &config.sticky.embed.color
        && parse_hex_color(color).is_none()
    {
        push(
            Severity::Warning,
            "sticky.embed.color",
            format!("\"{color}\" is not a #RRGGBB color; embeds will use the default"),
        );
    }
    if config.sticky.history_scan_limit == 0 || config.sticky.history_scan_limit > 100 {
        push(
            Severity::Warning,
            "sticky.history_scan_limit",
            "Discord returns between 1 and 100 messages per fetch; value will be clamped".into(),
        );
    }
    if config.sticky.webhook.name.trim().is_empty() {
        push(
            Severity::Error,
            "sticky.webhook.name",
            "webhook name must not be empty".into(),
        );
    }
    if !config.discord.has_token() {
        push(
            Severity::Warning,
            "discord.token",
            format!(
                "no bot token configured (set it here or via {})",
                crate::loader::TOKEN_ENV_VAR
            ),
        );
    }
    if config.update_check.enabled && config.update_check.timeout_secs == 0 {
        push(
            Severity::Warning,
            "update_check.timeout_secs",
            "a zero timeout makes every update check fail".into(),
        );
    }
    if config.metrics.enabled
        && let Some(listen) = &config.metrics.listen
        && listen.parse::<std::net::SocketAddr>().is_err()
    {
        push(
            Severity::Error,
            "metrics.listen",
            format!("\"{listen}\" is not a socket address"),
        );
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r##"
        [discord]
        token = "abc"

        [sticky]
        max_messages = 8

        [sticky.embed]
        color = "#112233"
    "##;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("sticky", "sticky"), 0);
        assert_eq!(levenshtein("stciky", "sticky"), 2);
    }

    #[test]
    fn valid_config_has_no_diagnostics() {
        let result = validate_str(VALID, "toml");
        assert!(
            result.diagnostics.is_empty(),
            "unexpected: {:?}",
            result.diagnostics
        );
    }

    #[test]
    fn misspelled_nested_key_gets_suggestion() {
        let result = validate_str("[sticky]\nmax_mesages = 3\n[discord]\ntoken='x'", "toml");
        let diag = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field")
            .unwrap();
        assert_eq!(diag.path, "sticky.max_mesages");
        assert!(diag.message.contains("max_messages"));
        assert!(result.has_errors());
    }

    #[test]
    fn syntax_error_stops_validation() {
        let result = validate_str("[sticky", "toml");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn type_error_reported() {
        let result = validate_str(r#"{"sticky":{"max_messages":"five"}}"#, "json");
        assert!(result.diagnostics.iter().any(|d| d.category == "type-error"));
    }

    #[test]
    fn zero_threshold_is_error() {
        let result = validate_str("[discord]\ntoken='x'\n[sticky]\nmax_messages = 0", "toml");
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "sticky.max_messages")
        );
    }

    #[test]
    fn bad_color_and_missing_token_warn() {
        let result = validate_str("sticky:\n  embed:\n    color: teal\n", "yaml");
        assert_eq!(result.count(Severity::Warning), 2);
        assert!(!result.has_errors());
    }

    #[test]
    fn bad_metrics_listen_is_error() {
        let result = validate_str(
            "[discord]\ntoken='x'\n[metrics]\nenabled = true\nlisten = 'localhost'",
            "toml",
        );
        assert!(result.diagnostics.iter().any(|d| d.path == "metrics.listen"));
    }
}
