//! Canonical live events and their downstream wire form.
//!
//! Every upstream transport normalizes its frames into [`LiveEvent`]. The
//! server converts each event into a [`ServerMessage`] before writing it to
//! the client socket.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::session::{RiskMode, StatusState};

/// A normalized event produced by an upstream live session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiveEvent {
    /// Model audio.
    Audio {
        /// Declared MIME type (e.g. `audio/pcm;rate=24000`).
        mime: String,
        /// Raw audio bytes.
        data: Vec<u8>,
    },
    /// Model text or a transcription fragment.
    Text {
        /// The text.
        text: String,
    },
    /// Session status change.
    Status {
        /// What happened.
        state: StatusState,
        /// Current risk mode.
        mode: RiskMode,
        /// Active skill code.
        skill: String,
    },
    /// Upstream or bridge error surfaced to the client.
    Error {
        /// Human-readable message.
        message: String,
    },
}

impl LiveEvent {
    /// Build a text event.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Build an error event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Build a status event.
    pub fn status(state: StatusState, mode: RiskMode, skill: impl Into<String>) -> Self {
        Self::Status {
            state,
            mode,
            skill: skill.into(),
        }
    }

    /// Event type string as it appears on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Audio { .. } => "server.audio",
            Self::Text { .. } => "server.text",
            Self::Status { .. } => "server.status",
            Self::Error { .. } => "error",
        }
    }
}

/// Downstream JSON message written to the client websocket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// `{type:"server.audio", mime, data_b64}`
    #[serde(rename = "server.audio")]
    Audio {
        /// Declared MIME type.
        mime: String,
        /// Base64 (standard alphabet) audio payload.
        data_b64: String,
    },
    /// `{type:"server.text", text}`
    #[serde(rename = "server.text")]
    Text {
        /// The text.
        text: String,
    },
    /// `{type:"server.status", state, mode, skill}`
    #[serde(rename = "server.status")]
    Status {
        /// Status state.
        state: StatusState,
        /// Risk mode.
        mode: RiskMode,
        /// Skill code.
        skill: String,
    },
    /// `{type:"server.summary", scenario, bullets}`
    #[serde(rename = "server.summary")]
    Summary {
        /// Skill code the session ran under.
        scenario: String,
        /// Ordered summary bullets.
        bullets: Vec<String>,
    },
    /// `{type:"error", message}`
    #[serde(rename = "error")]
    Error {
        /// Human-readable message.
        message: String,
    },
}

impl ServerMessage {
    /// Build an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl From<&LiveEvent> for ServerMessage {
    fn from(event: &LiveEvent) -> Self {
        match event {
            LiveEvent::Audio { mime, data } => Self::Audio {
                mime: mime.clone(),
                data_b64: base64::engine::general_purpose::STANDARD.encode(data),
            },
            LiveEvent::Text { text } => Self::Text { text: text.clone() },
            LiveEvent::Status { state, mode, skill } => Self::Status {
                state: *state,
                mode: *mode,
                skill: skill.clone(),
            },
            LiveEvent::Error { message } => Self::Error {
                message: message.clone(),
            },
        }
    }
}

impl From<LiveEvent> for ServerMessage {
    fn from(event: LiveEvent) -> Self {
        Self::from(&event)
    }
}
