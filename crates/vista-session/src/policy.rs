//! Trigger-phrase policy for risk escalation and the frame gate.
//!
//! Matching is lower-cased substring containment. The phrase tables are
//! data: operators can replace them with a JSON file without touching the
//! matching logic.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

/// Errors loading a policy file.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Failed to read the policy file.
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse the policy JSON.
    #[error("failed to parse policy JSON: {0}")]
    Json(#[from] serde_json::Error),
}

const REFUSAL: &[&str] = &[
    "cross the road",
    "cross a road",
    "cross the street",
    "cross a street",
    "electrical panel",
    "high-voltage",
    "high voltage",
    "breaker box",
];

const GOAL_REFUSAL_EXTRA: &[&str] = &[
    "medication dosing",
    "dosing decision",
    "dosage recommendation",
    "how much should i take",
    "how many should i take",
];

const CAUTION: &[&str] = &[
    "stairs",
    "escalator",
    "traffic",
    "vehicle",
    "car",
    "wet floor",
    "crowd",
    "knife",
    "sharp",
    "hot",
    "boiling",
    "electrical",
];

const FRAME_READY: &[&str] = &[
    "readable",
    "clear enough",
    "clear view",
    "good view",
    "that frame works",
    "i can read it now",
    "i can read the label",
    "i can read the text",
    "i can see it clearly",
    "the frame is clear",
];

const FRAME_UNCLEAR: &[&str] = &[
    "not readable",
    "still not readable",
    "cannot read",
    "can't read",
    "too blurry",
    "blurry",
    "too far",
    "too small",
    "cropped",
    "cut off",
    "blocked",
    "glare",
    "reflection",
    "mirrored",
    "unclear",
];

fn owned(phrases: &[&str]) -> Vec<String> {
    phrases.iter().map(|p| (*p).to_string()).collect()
}

/// Phrase tables consulted by the session state machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerPolicy {
    /// Model text containing any of these forces a refusal.
    pub refusal: Vec<String>,
    /// Goal text containing any of these refuses the session at construction.
    pub goal_refusal: Vec<String>,
    /// Text containing any of these escalates NORMAL to CAUTION.
    pub caution: Vec<String>,
    /// Model text signalling the camera view is usable.
    pub frame_ready: Vec<String>,
    /// Model text signalling the camera view is still unusable. Beats `frame_ready`.
    pub frame_unclear: Vec<String>,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        let mut goal_refusal = owned(REFUSAL);
        goal_refusal.extend(owned(GOAL_REFUSAL_EXTRA));
        Self {
            refusal: owned(REFUSAL),
            goal_refusal,
            caution: owned(CAUTION),
            frame_ready: owned(FRAME_READY),
            frame_unclear: owned(FRAME_UNCLEAR),
        }
    }
}

impl TriggerPolicy {
    /// Shared instance of the built-in tables.
    pub fn shared_default() -> Arc<Self> {
        static DEFAULT: OnceLock<Arc<TriggerPolicy>> = OnceLock::new();
        Arc::clone(DEFAULT.get_or_init(|| Arc::new(Self::default())))
    }

    /// Load a policy file. Missing tables keep their built-in values.
    pub fn from_json_file(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse a policy document. Phrases are lower-cased and trimmed.
    pub fn from_json_str(json: &str) -> Result<Self, PolicyError> {
        let mut policy: Self = serde_json::from_str(json)?;
        for table in [
            &mut policy.refusal,
            &mut policy.goal_refusal,
            &mut policy.caution,
            &mut policy.frame_ready,
            &mut policy.frame_unclear,
        ] {
            table.retain(|p| !p.trim().is_empty());
            for phrase in table.iter_mut() {
                *phrase = phrase.trim().to_lowercase();
            }
        }
        Ok(policy)
    }

    /// Whether lower-cased model text requests a refusal.
    pub fn is_refusal(&self, lower: &str) -> bool {
        contains_any(lower, &self.refusal)
    }

    /// Whether lower-cased goal text requests a refusal.
    pub fn is_goal_refusal(&self, lower: &str) -> bool {
        contains_any(lower, &self.goal_refusal)
    }

    /// Whether lower-cased text mentions a hazard.
    pub fn is_caution(&self, lower: &str) -> bool {
        contains_any(lower, &self.caution)
    }

    /// Whether lower-cased model text declares the frame usable.
    pub fn frame_is_ready(&self, lower: &str) -> bool {
        !self.frame_is_unclear(lower) && contains_any(lower, &self.frame_ready)
    }

    /// Whether lower-cased model text complains about the frame.
    pub fn frame_is_unclear(&self, lower: &str) -> bool {
        contains_any(lower, &self.frame_unclear)
    }
}

fn contains_any(lower: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|p| lower.contains(p.as_str()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
