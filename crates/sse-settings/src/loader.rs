//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SseSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `SSE_*` environment variable overrides
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use sse_hub::MatchMode;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::SseSettings;

/// Resolve the default settings path (`~/.sse-server/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".sse-server").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SseSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, defaults are used. Invalid JSON or values
/// that fail validation are errors.
pub fn load_settings_from_path(path: &Path) -> Result<SseSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<SseSettings> {
    let defaults = serde_json::to_value(SseSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Invalid values are ignored with a warning, leaving the file/default value
/// in place.
pub fn apply_env_overrides<F>(settings: &mut SseSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("SSE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.parsed("SSE_PORT", |s| parse_u16_range(s, 0, u16::MAX)) {
        settings.server.port = v;
    }
    if let Some(v) = env.parsed("SSE_ALLOW_PUBLISH", parse_bool) {
        settings.server.allow_publish = v;
    }
    if let Some(v) = env.parsed("SSE_KEEPALIVE_SECS", |s| parse_u64_range(s, 0, 3600)) {
        settings.server.keepalive_interval_secs = v;
    }

    // ── Hub ─────────────────────────────────────────────────────────
    if let Some(v) = env.parsed("SSE_CONNECTION_BUFFER", |s| parse_usize_range(s, 1, 1 << 20)) {
        settings.hub.connection_buffer = v;
    }
    if let Some(v) = env.parsed("SSE_MAILBOX_CAPACITY", |s| parse_usize_range(s, 1, 1 << 20)) {
        settings.hub.mailbox_capacity = v;
    }
    if let Some(v) = env.parsed("SSE_MATCH_MODE", MatchMode::parse) {
        settings.hub.match_mode = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("SSE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("SSE_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, key: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = self.string(key)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key, value = %val, "invalid env var, ignoring");
        }
        result
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
