//! Per-connection live configuration.
//!
//! Built from [`VistaSettings`] once at startup, then specialized per client
//! connection with the skill, goal, and resumption keys.

use std::time::Duration;

use vista_core::constants::DEFAULT_SKILL;
use vista_settings::{CompressionSettings, VistaSettings};

/// Everything a transport needs to open one upstream session.
#[derive(Clone, Debug)]
pub struct LiveConfig {
    /// Live model identifier.
    pub model_id: String,
    /// Requested region.
    pub location: String,
    /// Region tried when the requested one is unsupported or fails.
    pub fallback_location: Option<String>,
    /// Cloud project hosting the model.
    pub project_id: Option<String>,
    /// Opaque system-instruction text.
    pub system_instructions: String,
    /// Requested response modality (`AUDIO` or `TEXT`).
    pub response_modality: String,
    /// Bounded wait for the setup acknowledgement.
    pub setup_timeout: Duration,
    /// Websocket URL template with a `{region}` placeholder.
    pub endpoint_template: String,
    /// Context-window compression policy.
    pub compression: CompressionSettings,
    /// Prefer the managed runtime.
    pub use_managed_runtime: bool,
    /// Managed-runtime application name.
    pub app_name: String,
    /// Minimum spacing between transmitted camera frames.
    pub video_min_interval: Duration,
    /// Skill code for this connection (carried on status events).
    pub skill: String,
    /// Stable per-user key for session resumption.
    pub user_key: String,
    /// Stable per-session key for session resumption.
    pub session_key: String,
}

impl LiveConfig {
    /// Base configuration from loaded settings.
    pub fn from_settings(settings: &VistaSettings) -> Self {
        let live = &settings.live;
        Self {
            model_id: live.model_id.clone(),
            location: live.location.clone(),
            fallback_location: live.fallback_location.clone(),
            project_id: live.project_id.clone(),
            system_instructions: settings.effective_system_instructions().to_string(),
            response_modality: live.response_modality.clone(),
            setup_timeout: Duration::from_millis(live.setup_timeout_ms),
            endpoint_template: live.endpoint_template.clone(),
            compression: live.compression,
            use_managed_runtime: live.use_managed_runtime,
            app_name: live.app_name.clone(),
            video_min_interval: Duration::from_millis(live.video_min_interval_ms),
            skill: DEFAULT_SKILL.to_string(),
            user_key: String::new(),
            session_key: String::new(),
        }
    }

    /// Specialize for one client connection.
    #[must_use]
    pub fn for_session(
        mut self,
        skill: impl Into<String>,
        user_key: impl Into<String>,
        session_key: impl Into<String>,
    ) -> Self {
        self.skill = skill.into();
        self.user_key = user_key.into();
        self.session_key = session_key.into();
        self
    }

    /// Project id, if configured and non-blank.
    pub fn project(&self) -> Option<&str> {
        self.project_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Endpoint URL for one region.
    pub fn endpoint_for(&self, region: &str) -> String {
        self.endpoint_template.replace("{region}", region)
    }

    /// Fully qualified model resource name.
    pub fn model_resource(&self, project: &str, region: &str) -> String {
        format!(
            "projects/{project}/locations/{region}/publishers/google/models/{}",
            self.model_id
        )
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self::from_settings(&VistaSettings::default())
    }
}
