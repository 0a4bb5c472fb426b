//! Session enums shared between the state machine, transports, and the server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Session safety level.
///
/// Escalates monotonically: `Normal` → `Caution` → `Refuse`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskMode {
    /// No hazard detected.
    #[default]
    Normal,
    /// Plausible hazard; stricter verification before each step.
    Caution,
    /// Disallowed task; terminal.
    Refuse,
}

impl RiskMode {
    /// Wire spelling (`NORMAL`, `CAUTION`, `REFUSE`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Caution => "CAUTION",
            Self::Refuse => "REFUSE",
        }
    }
}

impl fmt::Display for RiskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversation phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Confirming the user's goal.
    #[default]
    Intent,
    /// Coaching the camera view until it is usable.
    Frame,
    /// Giving one step at a time.
    Guide,
    /// Checking progress before claiming success.
    Verify,
    /// Finished (or refused).
    Complete,
}

impl Phase {
    /// Wire spelling (`INTENT`, `FRAME`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intent => "INTENT",
            Self::Frame => "FRAME",
            Self::Guide => "GUIDE",
            Self::Verify => "VERIFY",
            Self::Complete => "COMPLETE",
        }
    }

    /// Phases in which the assistant expects the user to confirm a step.
    pub fn awaits_confirmation(self) -> bool {
        matches!(self, Self::Frame | Self::Guide | Self::Verify)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `state` field of a `server.status` message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    /// Upstream session is live (also re-sent after an interruption).
    Connected,
    /// Session entered caution mode.
    Caution,
    /// Session refused the task.
    Refuse,
}

impl StatusState {
    /// Wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Caution => "caution",
            Self::Refuse => "refuse",
        }
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
