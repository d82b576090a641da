//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`QuizcastSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{BusBackend, QuizcastSettings, RestartPolicySetting};

/// Resolve the path to the settings file (`~/.quizcast/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".quizcast").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<QuizcastSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, defaults are used. Invalid JSON or values
/// failing validation are errors.
pub fn load_settings_from_path(path: &Path) -> Result<QuizcastSettings> {
    let mut settings = read_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn read_file_layer(path: &Path) -> Result<QuizcastSettings> {
    let defaults = serde_json::to_value(QuizcastSettings::default())?;

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

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut QuizcastSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Each variable has strict parsing rules; invalid values are ignored with a
/// warning and the file/default value is kept.
pub fn apply_overrides(settings: &mut QuizcastSettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("QUIZCAST_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u16("PORT", 0, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = env.u16("QUIZCAST_PORT", 0, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = env.usize("QUIZCAST_SEND_QUEUE", 1, 1_000_000) {
        settings.server.send_queue_capacity = v;
    }

    // ── Bus ─────────────────────────────────────────────────────────
    if let Some(v) = env.string("QUIZCAST_BUS_BACKEND") {
        match parse_backend(&v) {
            Some(b) => settings.bus.backend = b,
            None => warn!(key = "QUIZCAST_BUS_BACKEND", value = %v, "invalid bus backend, ignoring"),
        }
    }
    if let Some(v) = env.string("REDIS_URL") {
        settings.bus.url = v;
    }
    if let Some(v) = env.string("QUIZCAST_BUS_URL") {
        settings.bus.url = v;
    }
    if let Some(v) = env.string("QUIZCAST_CHANNEL_PREFIX") {
        settings.bus.channel_prefix = v;
    }

    // ── Fanout ──────────────────────────────────────────────────────
    if let Some(v) = env.u64("QUIZCAST_POLL_INTERVAL_MS", 10, 60_000) {
        settings.fanout.poll_interval_ms = v;
    }
    if let Some(v) = env.u64("QUIZCAST_RECOVERY_DELAY_MS", 0, 600_000) {
        settings.fanout.recovery_delay_ms = v;
    }
    if let Some(v) = env.u64("QUIZCAST_SEND_TIMEOUT_MS", 1, 600_000) {
        settings.fanout.send_timeout_ms = v;
    }
    if let Some(v) = env.bool("QUIZCAST_VERBOSE_DELIVERY") {
        settings.fanout.verbose_delivery = v;
    }
    if let Some(v) = env.bool("QUIZCAST_RESTART_ON_CRASH") {
        settings.fanout.restart_policy = if v {
            RestartPolicySetting::OnCrash
        } else {
            RestartPolicySetting::Never
        };
    }

    // ── Content ─────────────────────────────────────────────────────
    if let Some(v) = env.string("OLLAMA_URL") {
        settings.content.base_url = v;
    }
    if let Some(v) = env.string("OLLAMA_MODEL_NAME") {
        settings.content.model = v;
    }
    if let Some(v) = env.string("FALLBACK_MODEL_NAME") {
        settings.content.fallback_model = Some(v);
    }
    if let Some(v) = env.u64("QUIZCAST_CONTENT_TIMEOUT_MS", 100, 600_000) {
        settings.content.timeout_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("QUIZCAST_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("QUIZCAST_LOG_JSON") {
        settings.logging.json = v;
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

/// Parse a bus backend name.
pub fn parse_backend(val: &str) -> Option<BusBackend> {
    match val.to_lowercase().as_str() {
        "memory" => Some(BusBackend::Memory),
        "redis" => Some(BusBackend::Redis),
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

// ── Variable readers ────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = (self.lookup)(name)?;
        let result = parse_u16_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        let val = (self.lookup)(name)?;
        let result = parse_usize_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid usize env var, ignoring");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8000, "host": "localhost"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "localhost");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4, 5]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["items"], serde_json::json!([4, 5]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = read_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.server.port, QuizcastSettings::default().server.port);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"bus": {"channelPrefix": "rooms:"}, "fanout": {"recoveryDelayMs": 250}}"#,
        )
        .unwrap();

        let settings = read_file_layer(&path).unwrap();
        assert_eq!(settings.bus.channel_prefix, "rooms:");
        assert_eq!(settings.fanout.recovery_delay_ms, 250);
        assert_eq!(settings.fanout.poll_interval_ms, 1000);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_settings_from_path(&path);
        assert!(matches!(result.unwrap_err(), SettingsError::Json(_)));
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"bus": {"channelPrefix": ""}}"#).unwrap();

        let mut settings = read_file_layer(&path).unwrap();
        apply_overrides(&mut settings, |_| None);
        assert!(matches!(
            settings.validate().unwrap_err(),
            SettingsError::InvalidValue(_)
        ));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply_over_file_values() {
        let mut s = QuizcastSettings::default();
        apply_overrides(
            &mut s,
            lookup_from(&[
                ("REDIS_URL", "redis://cache:6379"),
                ("PORT", "9001"),
                ("QUIZCAST_BUS_BACKEND", "redis"),
                ("QUIZCAST_VERBOSE_DELIVERY", "yes"),
                ("QUIZCAST_RESTART_ON_CRASH", "1"),
                ("OLLAMA_MODEL_NAME", "llama3:latest"),
                ("FALLBACK_MODEL_NAME", "phi3"),
            ]),
        );
        assert_eq!(s.bus.url, "redis://cache:6379");
        assert_eq!(s.server.port, 9001);
        assert_eq!(s.bus.backend, BusBackend::Redis);
        assert!(s.fanout.verbose_delivery);
        assert_eq!(s.fanout.restart_policy, RestartPolicySetting::OnCrash);
        assert_eq!(s.content.model, "llama3:latest");
        assert_eq!(s.content.fallback_model.as_deref(), Some("phi3"));
    }

    #[test]
    fn quizcast_port_wins_over_port() {
        let mut s = QuizcastSettings::default();
        apply_overrides(&mut s, lookup_from(&[("PORT", "9001"), ("QUIZCAST_PORT", "9002")]));
        assert_eq!(s.server.port, 9002);
    }

    #[test]
    fn invalid_override_values_ignored() {
        let mut s = QuizcastSettings::default();
        apply_overrides(
            &mut s,
            lookup_from(&[
                ("PORT", "not-a-port"),
                ("QUIZCAST_POLL_INTERVAL_MS", "1"),
                ("QUIZCAST_VERBOSE_DELIVERY", "maybe"),
                ("QUIZCAST_BUS_BACKEND", "kafka"),
            ]),
        );
        let d = QuizcastSettings::default();
        assert_eq!(s.server.port, d.server.port);
        assert_eq!(s.fanout.poll_interval_ms, d.fanout.poll_interval_ms);
        assert!(!s.fanout.verbose_delivery);
        assert_eq!(s.bus.backend, BusBackend::Memory);
    }

    #[test]
    fn empty_string_override_ignored() {
        let mut s = QuizcastSettings::default();
        apply_overrides(&mut s, lookup_from(&[("QUIZCAST_HOST", "")]));
        assert_eq!(s.server.host, "0.0.0.0");
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for t in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_bool(t), Some(true), "{t}");
        }
        for f in ["false", "0", "no", "OFF"] {
            assert_eq!(parse_bool(f), Some(false), "{f}");
        }
        assert_eq!(parse_bool("2"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u64_range("500", 10, 1000), Some(500));
        assert_eq!(parse_u64_range("5", 10, 1000), None);
        assert_eq!(parse_usize_range("abc", 1, 10), None);
    }

    #[test]
    fn parse_backend_names() {
        assert_eq!(parse_backend("Redis"), Some(BusBackend::Redis));
        assert_eq!(parse_backend("memory"), Some(BusBackend::Memory));
        assert_eq!(parse_backend("nats"), None);
    }
}
