//! Per-connection session state machine.
//!
//! Tracks skill, phase, risk mode, and confirmation bookkeeping for one live
//! session. Mutated only by three external triggers (client video, client
//! confirm, model text) plus the internal frame gate, all applied from a
//! single task in arrival order.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use vista_core::{LiveEvent, Phase, RiskMode, StatusState};

use crate::catalog::{self, SkillSpec};
use crate::notes::NotesBuffer;
use crate::policy::TriggerPolicy;
use crate::prompts;

/// Maximum number of bullets in a session summary.
pub const MAX_SUMMARY_BULLETS: usize = 6;

/// Payload of the `server.summary` message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Skill code the session ran under.
    pub scenario: String,
    /// Ordered bullets, at most [`MAX_SUMMARY_BULLETS`].
    pub bullets: Vec<String>,
}

/// Mutable state for one live session.
#[derive(Debug)]
pub struct SessionState {
    skill: &'static str,
    spec: &'static SkillSpec,
    goal: Option<String>,
    phase: Phase,
    risk_mode: RiskMode,
    awaiting_confirmation: bool,
    confirmations: u32,
    saw_video: bool,
    completed: bool,
    frame_ready: bool,
    last_instruction: Option<String>,
    last_assistant_text: Option<String>,
    saw_assistant_audio: bool,
    notes: NotesBuffer,
    policy: Arc<TriggerPolicy>,
}

impl SessionState {
    /// New session with the built-in trigger tables.
    pub fn new(skill: &str, goal: Option<&str>) -> Self {
        Self::with_policy(skill, goal, TriggerPolicy::shared_default())
    }

    /// New session classified against `policy`.
    ///
    /// A refuse-by-default skill or a refused goal ends the session
    /// immediately (`REFUSE`, `COMPLETE`). Otherwise caution-by-default
    /// skills start in `CAUTION` and frame-first skills start in `FRAME`.
    pub fn with_policy(skill: &str, goal: Option<&str>, policy: Arc<TriggerPolicy>) -> Self {
        let (skill, spec) = catalog::resolve(skill);
        let goal = goal.map(str::trim).filter(|g| !g.is_empty()).map(str::to_string);

        let mut state = Self {
            skill,
            spec,
            goal,
            phase: Phase::Intent,
            risk_mode: RiskMode::Normal,
            awaiting_confirmation: false,
            confirmations: 0,
            saw_video: false,
            completed: false,
            frame_ready: false,
            last_instruction: None,
            last_assistant_text: None,
            saw_assistant_audio: false,
            notes: NotesBuffer::new(),
            policy,
        };

        if spec.refuse_default || state.goal_is_refused() {
            state.risk_mode = RiskMode::Refuse;
            state.phase = Phase::Complete;
            state.completed = true;
            info!(skill, "session refused at start");
            return state;
        }
        if spec.caution_default {
            state.risk_mode = RiskMode::Caution;
        }
        if spec.frame_first {
            state.phase = Phase::Frame;
        }
        state
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Canonical skill code.
    pub fn skill(&self) -> &'static str {
        self.skill
    }

    /// Catalog entry for the skill.
    pub fn spec(&self) -> &'static SkillSpec {
        self.spec
    }

    /// Goal text, if any.
    pub fn goal(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current risk mode.
    pub fn risk_mode(&self) -> RiskMode {
        self.risk_mode
    }

    /// Whether a user confirmation is expected.
    pub fn awaiting_confirmation(&self) -> bool {
        self.awaiting_confirmation
    }

    /// Number of accepted confirmations.
    pub fn confirmations(&self) -> u32 {
        self.confirmations
    }

    /// Whether the session completed (or was refused).
    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Whether the frame gate has cleared.
    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// Whether any camera frame was received.
    pub fn saw_video(&self) -> bool {
        self.saw_video
    }

    /// Pending instruction awaiting confirmation.
    pub fn last_instruction(&self) -> Option<&str> {
        self.last_instruction.as_deref()
    }

    /// Most recent assistant utterances, oldest first.
    pub fn recent_notes(&self) -> Vec<String> {
        self.notes.iter().map(str::to_string).collect()
    }

    // ── Triggers ────────────────────────────────────────────────────

    /// Status events to send right after the upstream connects.
    ///
    /// A hazard in the goal text escalates a `NORMAL` session to `CAUTION` here.
    pub fn on_connect_events(&mut self) -> Vec<LiveEvent> {
        match self.risk_mode {
            RiskMode::Refuse => vec![self.status(StatusState::Refuse)],
            RiskMode::Caution => vec![self.status(StatusState::Caution)],
            RiskMode::Normal if self.goal_is_caution() => {
                self.risk_mode = RiskMode::Caution;
                vec![self.status(StatusState::Caution)]
            }
            RiskMode::Normal => Vec::new(),
        }
    }

    /// First user turn sent upstream.
    pub fn opening_prompt(&self) -> String {
        if self.risk_mode == RiskMode::Refuse {
            return prompts::refusal_prompt(self.skill, self.spec);
        }
        prompts::opening_prompt(self.skill, self.spec, self.goal.as_deref(), self.risk_mode)
    }

    /// A camera frame arrived from the client.
    pub fn on_client_video(&mut self) {
        self.saw_video = true;
        if self.needs_frame_gate() || self.phase == Phase::Intent {
            self.phase = Phase::Frame;
        }
    }

    /// The user confirmed the pending step.
    ///
    /// Returns the prompt to forward upstream, or `None` when there is
    /// nothing to confirm.
    pub fn on_client_confirm(&mut self) -> Option<&'static str> {
        if self.risk_mode == RiskMode::Refuse || !self.awaiting_confirmation {
            return None;
        }
        if self.last_instruction.is_none() && self.last_assistant_text.is_none() {
            return None;
        }

        self.confirmations += 1;
        self.awaiting_confirmation = false;

        if self.needs_frame_gate() {
            self.phase = Phase::Frame;
            return Some(prompts::REVERIFY_FRAME_PROMPT);
        }
        self.phase = match self.phase {
            Phase::Intent | Phase::Frame | Phase::Guide => Phase::Verify,
            Phase::Verify => Phase::Guide,
            Phase::Complete => Phase::Complete,
        };
        debug!(skill = self.skill, phase = %self.phase, confirmations = self.confirmations, "confirmation accepted");
        Some(prompts::CONFIRM_STEP_PROMPT)
    }

    /// Model text (or a transcript fragment) arrived.
    ///
    /// Returns status events produced by risk escalation.
    pub fn on_model_text(&mut self, text: &str) -> Vec<LiveEvent> {
        let clean = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if clean.is_empty() {
            return Vec::new();
        }
        self.notes.push(clean.clone());
        let lower = clean.to_lowercase();
        self.last_assistant_text = Some(clean);

        let events: Vec<LiveEvent> = self.update_risk_mode(&lower).into_iter().collect();
        if self.risk_mode == RiskMode::Refuse || self.phase == Phase::Complete {
            return events;
        }

        if self.needs_frame_gate() {
            // A match verdict implies the model could read the frame.
            let verdict = contains_any(&lower, MATCH_VERDICT_MARKERS)
                && !self.policy.frame_is_unclear(&lower);
            if verdict || self.policy.frame_is_ready(&lower) {
                self.frame_ready = true;
                self.phase = Phase::Guide;
                debug!(skill = self.skill, "frame gate cleared");
            } else {
                self.phase = Phase::Frame;
                self.awaiting_confirmation = true;
                self.last_instruction = self.last_assistant_text.as_deref().map(first_sentence);
                return events;
            }
        }

        if contains_any(&lower, VERIFY_MARKERS) {
            self.phase = Phase::Verify;
        } else if contains_any(&lower, COMPLETE_MARKERS) {
            self.phase = Phase::Complete;
            self.completed = true;
        } else if self.phase == Phase::Intent {
            self.phase = Phase::Frame;
        } else {
            self.phase = Phase::Guide;
        }

        self.awaiting_confirmation = self.phase.awaits_confirmation();
        if self.awaiting_confirmation {
            self.last_instruction = self.last_assistant_text.as_deref().map(first_sentence);
        }
        events
    }

    /// Model audio arrived. Only affects the summary.
    pub fn on_model_audio(&mut self) {
        self.saw_assistant_audio = true;
    }

    /// Closing summary for the client.
    pub fn summary_payload(&self) -> SessionSummary {
        let mut bullets = Vec::with_capacity(MAX_SUMMARY_BULLETS);
        bullets.push(format!(
            "Skill: {}. Baseline risk: {}.",
            self.skill, self.spec.base_risk
        ));
        bullets.push(format!(
            "Goal: {}",
            self.goal
                .as_deref()
                .unwrap_or("Not explicitly captured in the session metadata.")
        ));
        bullets.push(format!(
            "Risk mode ended in {}. Phase reached: {}. Confirmations received: {}.",
            self.risk_mode, self.phase, self.confirmations
        ));
        bullets.push(
            if self.saw_video {
                "Camera frames were shared during the session."
            } else {
                "The session stayed audio-only."
            }
            .to_string(),
        );
        if self.spec.frame_first {
            bullets.push(
                if self.frame_ready {
                    "Frame gate cleared before analysis."
                } else {
                    "Frame gate never cleared; the assistant should keep asking for a better view."
                }
                .to_string(),
            );
        }
        bullets.push(self.outcome_bullet());
        bullets.truncate(MAX_SUMMARY_BULLETS);

        SessionSummary {
            scenario: self.skill.to_string(),
            bullets,
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    fn outcome_bullet(&self) -> String {
        if self.completed {
            format!("Done when: {}", self.spec.done_when)
        } else if let Some(step) = &self.last_instruction {
            format!("Last guided step: {step}")
        } else if let Some(text) = &self.last_assistant_text {
            format!("Last assistant response: {}", first_sentence(text))
        } else if self.saw_assistant_audio {
            "Assistant audio was received, but no transcript text was captured.".to_string()
        } else {
            "No assistant response was captured.".to_string()
        }
    }

    fn update_risk_mode(&mut self, lower: &str) -> Option<LiveEvent> {
        if self.risk_mode != RiskMode::Refuse && self.policy.is_refusal(lower) {
            self.risk_mode = RiskMode::Refuse;
            self.phase = Phase::Complete;
            self.completed = true;
            self.awaiting_confirmation = false;
            info!(skill = self.skill, "model text triggered refusal");
            return Some(self.status(StatusState::Refuse));
        }
        if self.risk_mode == RiskMode::Normal && self.policy.is_caution(lower) {
            self.risk_mode = RiskMode::Caution;
            info!(skill = self.skill, "model text triggered caution");
            return Some(self.status(StatusState::Caution));
        }
        None
    }

    fn needs_frame_gate(&self) -> bool {
        self.spec.frame_first && !self.frame_ready && self.risk_mode != RiskMode::Refuse
    }

    fn goal_is_refused(&self) -> bool {
        self.goal
            .as_deref()
            .is_some_and(|g| self.policy.is_goal_refusal(&g.to_lowercase()))
    }

    fn goal_is_caution(&self) -> bool {
        self.goal
            .as_deref()
            .is_some_and(|g| self.policy.is_caution(&g.to_lowercase()))
    }

    fn status(&self, state: StatusState) -> LiveEvent {
        LiveEvent::status(state, self.risk_mode, self.skill)
    }
}

const VERIFY_MARKERS: &[&str] = &["hold still", "confirming", "let me check", "verify"];
const COMPLETE_MARKERS: &[&str] = &["done", "confirmed", "you reached", "match", "not a match"];
const MATCH_VERDICT_MARKERS: &[&str] = &["match", "not a match"];

fn contains_any(lower: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| lower.contains(m))
}

/// Text up to the first `". "`, `"? "`, or `"! "` (checked in that order).
pub fn first_sentence(text: &str) -> String {
    for sep in [". ", "? ", "! "] {
        if let Some((head, _)) = text.split_once(sep) {
            return format!("{}{}", head.trim(), sep.trim());
        }
    }
    text.trim().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
