//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`VistaSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `VISTA_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::VistaSettings;

/// Resolve the path to the settings file (`~/.vista/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".vista").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<VistaSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. An unreadable or invalid file is an error.
pub fn load_settings_from_path(path: &Path) -> Result<VistaSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults deep-merged with the file at `path`, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<VistaSettings> {
    let defaults = serde_json::to_value(VistaSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
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
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut VistaSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Integers must parse and fall within range, booleans accept
/// `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`. Invalid values are
/// ignored with a warning.
pub fn apply_overrides(settings: &mut VistaSettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };

    // ── Live session ────────────────────────────────────────────────
    if let Some(v) = env.string("VISTA_MODEL_ID") {
        settings.live.model_id = v;
    }
    if let Some(v) = env.string("VISTA_LOCATION") {
        settings.live.location = v;
    }
    if let Some(v) = env.string("VISTA_FALLBACK_LOCATION") {
        settings.live.fallback_location = Some(v);
    }
    if let Some(v) = env.string("VISTA_PROJECT_ID") {
        settings.live.project_id = Some(v);
    }
    if settings.live.project_id.is_none() {
        settings.live.project_id = env.string("GOOGLE_CLOUD_PROJECT");
    }
    if let Some(v) = env.bool("VISTA_USE_MANAGED_RUNTIME") {
        settings.live.use_managed_runtime = v;
    }
    if let Some(v) = env.string("VISTA_RESPONSE_MODALITY") {
        settings.live.response_modality = v.to_uppercase();
    }
    if let Some(v) = env.number("VISTA_SETUP_TIMEOUT_MS", 100..=60_000) {
        settings.live.setup_timeout_ms = v;
    }
    if let Some(v) = env.string("VISTA_ENDPOINT_TEMPLATE") {
        settings.live.endpoint_template = v;
    }
    if let Some(v) = env.string("VISTA_APP_NAME") {
        settings.live.app_name = v;
    }
    if let Some(v) = env.string("VISTA_SYSTEM_INSTRUCTIONS") {
        settings.system_instructions = Some(v);
    }
    if let Some(v) = env.string("VISTA_SAFETY_POLICY_PATH") {
        settings.safety_policy_path = Some(v);
    }

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("VISTA_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.number("VISTA_PORT", 0..=u16::MAX) {
        settings.server.port = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("VISTA_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("VISTA_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

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

/// Parse a number and keep it only if it falls inside `range`.
pub fn parse_in_range<T: FromStr + PartialOrd>(val: &str, range: RangeInclusive<T>) -> Option<T> {
    val.trim().parse().ok().filter(|n| range.contains(n))
}

// ── Env var readers ─────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        self.parsed(name, "boolean", parse_bool)
    }

    fn number<T: FromStr + PartialOrd>(&self, name: &str, range: RangeInclusive<T>) -> Option<T> {
        self.parsed(name, "number", |val| parse_in_range(val, range))
    }

    fn parsed<T>(&self, name: &str, kind: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let val = (self.lookup)(name)?;
        let parsed = parse(&val);
        if parsed.is_none() {
            warn!(key = name, value = %val, kind, "ignoring invalid env override");
        }
        parsed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
