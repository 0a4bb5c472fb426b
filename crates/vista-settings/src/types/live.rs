//! Upstream live-model connection settings.

use serde::{Deserialize, Serialize};

/// Default Vertex AI live websocket endpoint; `{region}` is substituted per candidate.
pub const DEFAULT_ENDPOINT_TEMPLATE: &str = "wss://{region}-aiplatform.googleapis.com/ws/google.cloud.aiplatform.v1beta1.LlmBidiService/BidiGenerateContent";

/// Settings for the upstream live session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveSettings {
    /// Live model identifier.
    pub model_id: String,
    /// Requested region.
    pub location: String,
    /// Region tried when the requested one is unsupported or fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_location: Option<String>,
    /// Cloud project hosting the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Prefer the managed streaming runtime over the direct websocket.
    pub use_managed_runtime: bool,
    /// Requested response modality (`AUDIO` or `TEXT`).
    pub response_modality: String,
    /// How long to wait for the setup acknowledgement before proceeding.
    pub setup_timeout_ms: u64,
    /// Websocket URL template containing a `{region}` placeholder.
    pub endpoint_template: String,
    /// Context-window compression policy.
    pub compression: CompressionSettings,
    /// Application name registered with the managed runtime.
    pub app_name: String,
    /// Minimum spacing between transmitted camera frames.
    pub video_min_interval_ms: u64,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            model_id: "gemini-live-2.5-flash-native-audio".to_string(),
            location: "us-central1".to_string(),
            fallback_location: None,
            project_id: None,
            use_managed_runtime: false,
            response_modality: "AUDIO".to_string(),
            setup_timeout_ms: 5_000,
            endpoint_template: DEFAULT_ENDPOINT_TEMPLATE.to_string(),
            compression: CompressionSettings::default(),
            app_name: "vista-ai".to_string(),
            video_min_interval_ms: 1_000,
        }
    }
}

impl LiveSettings {
    /// Endpoint URL for one region.
    pub fn endpoint_for(&self, region: &str) -> String {
        self.endpoint_template.replace("{region}", region)
    }
}

/// Sliding-window context compression sent in the setup handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressionSettings {
    /// Context size that triggers compression.
    pub trigger_tokens: u32,
    /// Context size kept after compression.
    pub target_tokens: u32,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            trigger_tokens: 25_600,
            target_tokens: 12_800,
        }
    }
}
