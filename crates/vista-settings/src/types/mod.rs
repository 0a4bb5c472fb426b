//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file
//! format. Each type implements [`Default`] with production default values,
//! and `#[serde(default)]` lets partial JSON fill the remaining fields.

mod live;
mod server;

pub use live::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::constitution::DEFAULT_SYSTEM_INSTRUCTIONS;

/// Root settings type for the Vista bridge.
///
/// Loaded from `~/.vista/settings.json` with defaults applied for missing
/// fields. `VISTA_*` environment variables override specific values.
///
/// # JSON Format
///
/// ```json
/// {
///   "live": { "location": "europe-west4", "fallbackLocation": "us-central1" },
///   "server": { "port": 9090 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VistaSettings {
    /// Upstream live-model connection settings.
    pub live: LiveSettings,
    /// HTTP / WebSocket server settings.
    pub server: ServerSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// System-instruction text sent in the setup handshake.
    ///
    /// Empty or absent falls back to [`DEFAULT_SYSTEM_INSTRUCTIONS`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instructions: Option<String>,
    /// Optional JSON file replacing the built-in trigger-phrase tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_policy_path: Option<String>,
}

impl VistaSettings {
    /// System instructions to send upstream, falling back to the built-in text.
    pub fn effective_system_instructions(&self) -> &str {
        match self.system_instructions.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => DEFAULT_SYSTEM_INSTRUCTIONS,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit newline-delimited JSON instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_deserializes_to_defaults() {
        let settings: VistaSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.live.model_id, "gemini-live-2.5-flash-native-audio");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.logging.level, "info");
        assert!(settings.system_instructions.is_none());
    }

    #[test]
    fn missing_instructions_fall_back_to_constitution() {
        let settings = VistaSettings::default();
        assert_eq!(
            settings.effective_system_instructions(),
            DEFAULT_SYSTEM_INSTRUCTIONS
        );
    }

    #[test]
    fn blank_instructions_fall_back_to_constitution() {
        let settings = VistaSettings {
            system_instructions: Some("   \n".into()),
            ..VistaSettings::default()
        };
        assert_eq!(
            settings.effective_system_instructions(),
            DEFAULT_SYSTEM_INSTRUCTIONS
        );
    }

    #[test]
    fn custom_instructions_win() {
        let settings = VistaSettings {
            system_instructions: Some("Be brief.".into()),
            ..VistaSettings::default()
        };
        assert_eq!(settings.effective_system_instructions(), "Be brief.");
    }

    #[test]
    fn optional_fields_skipped_when_none() {
        let value = serde_json::to_value(VistaSettings::default()).unwrap();
        assert!(value.get("systemInstructions").is_none());
        assert!(value.get("safetyPolicyPath").is_none());
        assert!(value.get("live").is_some());
    }
}
