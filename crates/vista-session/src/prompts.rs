//! Text turns sent upstream on behalf of the user.

use std::fmt::Write as _;

use vista_core::RiskMode;

use crate::catalog::SkillSpec;

/// Sent on confirm while the frame gate is still closed.
pub const REVERIFY_FRAME_PROMPT: &str = "I adjusted the camera. Verify only the frame before you answer the task. \
If the view is still unclear, give exactly one camera adjustment. \
If it is finally clear enough, say 'Readable.' and then continue carefully.";

/// Sent on confirm once the frame gate is clear (or not applicable).
pub const CONFIRM_STEP_PROMPT: &str = "Yes, I finished that step. \
Please verify progress before you say it worked, \
and then give exactly one next safe step. \
If the evidence is unclear, ask for a better view.";

const REFUSE_FALLBACK_HANDOFF: &str = "Offer a safer alternative.";

const CONSTITUTION_REMINDER: &str = "Follow the constitution: never guess, ask for a better view when uncertain, \
give exactly one instruction at a time, and verify before claiming success.";

/// Refusal directive for a disallowed skill or goal.
pub fn refusal_prompt(skill: &str, spec: &SkillSpec) -> String {
    format!(
        "The requested task is {skill}. This skill is disallowed as an autonomous guide. \
Refuse clearly, state the reason briefly, and do not provide operational guidance. {}",
        spec.handoff.unwrap_or(REFUSE_FALLBACK_HANDOFF)
    )
}

/// Structured opening instruction for an allowed session.
pub fn opening_prompt(skill: &str, spec: &SkillSpec, goal: Option<&str>, mode: RiskMode) -> String {
    let mut out = format!(
        "I am starting a {skill} session. Skill objective: {} Baseline risk: {}. Completion condition: {} ",
        spec.anchor, spec.base_risk, spec.done_when
    );
    match goal {
        Some(goal) => {
            let _ = write!(out, "My goal is: {goal}. ");
        }
        None => out.push_str("Ask one short question to confirm my goal. "),
    }
    if mode == RiskMode::Caution {
        out.push_str("Start in CAUTION mode and use stricter verification before each new step. ");
    }
    if let (true, Some(capture)) = (spec.frame_first, spec.capture_prompt) {
        let _ = write!(
            out,
            "{capture} Do not analyze, compare, or claim success until you have explicitly confirmed the frame is readable. "
        );
    }
    out.push_str(CONSTITUTION_REMINDER);
    out
}
