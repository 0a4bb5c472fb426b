//! Static skill catalog.
//!
//! Each skill seeds the session's initial risk mode and phase and supplies
//! the text fragments of the opening instruction.

use vista_core::constants::DEFAULT_SKILL;

/// Runtime metadata for one skill.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkillSpec {
    /// What the assistant is trying to accomplish.
    pub anchor: &'static str,
    /// Baseline risk label (`R0` .. `R3`).
    pub base_risk: &'static str,
    /// When the session counts as complete.
    pub done_when: &'static str,
    /// Start in caution mode.
    pub caution_default: bool,
    /// Refuse outright.
    pub refuse_default: bool,
    /// Gate analysis behind a readable camera frame.
    pub frame_first: bool,
    /// Safer alternative offered on refusal.
    pub handoff: Option<&'static str>,
    /// Camera coaching preamble for frame-first skills.
    pub capture_prompt: Option<&'static str>,
}

impl SkillSpec {
    const fn basic(anchor: &'static str, base_risk: &'static str, done_when: &'static str) -> Self {
        Self {
            anchor,
            base_risk,
            done_when,
            caution_default: false,
            refuse_default: false,
            frame_first: false,
            handoff: None,
            capture_prompt: None,
        }
    }

    const fn frame_first(mut self, capture_prompt: &'static str) -> Self {
        self.frame_first = true;
        self.capture_prompt = Some(capture_prompt);
        self
    }

    const fn caution(mut self) -> Self {
        self.caution_default = true;
        self
    }

    const fn refuse(mut self, handoff: &'static str) -> Self {
        self.refuse_default = true;
        self.handoff = Some(handoff);
        self
    }
}

const FRAME_COACH_CAPTURE: &str = "Start in FRAME mode. Give one exact camera instruction at a time and do not analyze the scene yet. \
Only say 'Readable.' when the frame is actually clear and steady.";

const FRAME_COACH_ANCHOR: &str =
    "Coach the user to hold a steady, readable frame with exact camera instructions.";

const FRAME_COACH_DONE: &str = "You say the frame is readable and the user confirms.";

/// Every supported skill, keyed by its upper-case code.
pub static SKILLS: &[(&str, SkillSpec)] = &[
    (
        "REORIENT",
        SkillSpec::basic(
            "Provide a one or two sentence scene anchor so the user knows what is ahead, left, and right.",
            "R0",
            "The user confirms they understand the front, left, and right reference.",
        ),
    ),
    (
        "HOLD_STEADY",
        SkillSpec::basic(FRAME_COACH_ANCHOR, "R0", FRAME_COACH_DONE).frame_first(FRAME_COACH_CAPTURE),
    ),
    (
        "FRAME_COACH",
        SkillSpec::basic(FRAME_COACH_ANCHOR, "R0", FRAME_COACH_DONE).frame_first(FRAME_COACH_CAPTURE),
    ),
    (
        "READ_TEXT",
        SkillSpec::basic(
            "Read exactly what is visible, summarize briefly, and mark uncertain parts.",
            "R0",
            "The user confirms they received the information they needed.",
        )
        .frame_first(
            "Do not read or summarize yet. First require one sign, label, or document section at a time. \
Ask the user to move closer until the text fills at least half the frame, center it, reduce glare, \
and hold still for two seconds. If any text is blurry, mirrored, cropped, or blocked, say it is \
unreadable and ask for one exact camera adjustment.",
        ),
    ),
    (
        "NAV_FIND",
        SkillSpec::basic(
            "Find a door, sign, counter, exit, elevator, or restroom and guide the user there with verification.",
            "R1",
            "The target is confirmed and the user is positioned at it.",
        ),
    ),
    (
        "QUEUE_AND_COUNTER",
        SkillSpec::basic(
            "Locate the correct queue and service point and align the user safely.",
            "R1",
            "The user is aligned with the intended queue or counter.",
        ),
    ),
    (
        "SHOP_VERIFY",
        SkillSpec::basic(
            "Verify whether an item matches the requested product, variant, size, and price if visible.",
            "R1",
            "The user has the correct item or a safe alternative is chosen.",
        )
        .frame_first(
            "Do not compare multiple packages at once. Ask for one item front-facing and centered first. \
If price matters, ask for the price tag as a separate close frame. If the brand, size, or variant \
is not clearly readable, say it is unverified and request a better single-item view.",
        ),
    ),
    (
        "PRICE_AND_DEAL_CHECK",
        SkillSpec::basic(
            "Read prices, unit prices if visible, and compare the relevant items.",
            "R1",
            "The user selects one item.",
        )
        .frame_first(
            "Require one price tag or one item label at a time. Ask for a close, steady view where the price fills \
a large part of the frame. Only compare items after each price has been captured clearly.",
        ),
    ),
    (
        "MONEY_HANDLING",
        SkillSpec::basic(
            "Identify notes or coins, confirm change, and help organize cash.",
            "R1",
            "The user confirms the amount is organized.",
        )
        .frame_first(
            "Ask for a plain background and one coin or bank note at a time. Do not estimate from a pile. \
If edges, color, or denomination marks are unclear, request a closer single-item view.",
        ),
    ),
    (
        "OBJECT_LOCATE",
        SkillSpec::basic(
            "Locate an item in reachable space and guide the user to it.",
            "R1",
            "The user confirms they picked it up.",
        )
        .frame_first(
            "Start by asking for a slow sweep of one surface or area. Once a likely target appears, ask the user \
to stop, center that area, and hold steady. If the scene is cluttered, ask them to narrow the frame \
instead of guessing.",
        ),
    ),
    (
        "DEVICE_BUTTONS_AND_DIALS",
        SkillSpec::basic(
            "Identify controls and provide safe, explicit one-step device guidance.",
            "R1-R2",
            "The requested setting is verified.",
        )
        .frame_first(
            "Require one control panel or one dial at a time. Ask for a close frame where labels and indicator marks \
are centered and readable before naming any control.",
        ),
    ),
    (
        "SOCIAL_CONTEXT",
        SkillSpec::basic(
            "Describe the nearby social scene without guessing identities or sensitive traits.",
            "R0-R1",
            "The user confirms they feel socially oriented.",
        ),
    ),
    (
        "FACE_TO_SPEAKER",
        SkillSpec::basic(
            "Orient the user toward the current speaker with directional cues.",
            "R0",
            "The user is oriented toward the speaker.",
        ),
    ),
    (
        "FORM_FILL_HELP",
        SkillSpec::basic(
            "Guide one form or kiosk step at a time and verify the selected field or button.",
            "R1",
            "The current form step is completed and confirmed.",
        )
        .frame_first(
            "Require a close frame of only the active screen region. Ask the user to center the selected field or \
button, reduce glare, and hold steady before you name any control.",
        ),
    ),
    (
        "MEDICATION_LABEL_READ",
        SkillSpec::basic(
            "Read visible medication label text for one item at a time without interpreting dosage or instructions.",
            "R1",
            "The label text was read clearly, or you explicitly said the label is still unreadable.",
        )
        .frame_first(
            "Require exactly one medication item at a time. Ask for the front label first, centered and close enough \
that the label fills most of the frame. If text or numbers are mirrored, blurry, cropped, or blocked, \
say they are unreadable and ask for a better view instead of guessing.",
        ),
    ),
    (
        "COOKING_ASSIST",
        SkillSpec::basic(
            "MVP scope is cold prep only: read instructions, measure, and identify ingredients.",
            "R2",
            "The current prep step is completed with verification.",
        )
        .caution(),
    ),
    (
        "STAIRS_ESCALATOR_ELEVATOR",
        SkillSpec::basic(
            "At stairs or escalators, stop first, use conservative guidance, and recommend assistance if uncertain.",
            "R2",
            "The user reaches a safe decision point.",
        )
        .caution(),
    ),
    (
        "TRAFFIC_CROSSING",
        SkillSpec::basic(
            "Do not guide the user through live traffic.",
            "R3",
            "You have refused and handed off safely.",
        )
        .refuse("Offer to locate the crossing button or signage, then advise a sighted handoff."),
    ),
    (
        "MEDICATION_DOSING",
        SkillSpec::basic(
            "Do not make medication dosing decisions.",
            "R3",
            "You have refused dosing guidance and redirected to MEDICATION_LABEL_READ for label text only.",
        )
        .refuse("Offer MEDICATION_LABEL_READ to read visible label text only, but do not interpret dosage."),
    ),
];

/// Exact (upper-case) catalog lookup.
pub fn get(code: &str) -> Option<&'static SkillSpec> {
    SKILLS.iter().find(|(c, _)| *c == code).map(|(_, spec)| spec)
}

/// Resolve a requested skill case-insensitively, falling back to the default skill.
///
/// Returns the canonical code together with its spec.
pub fn resolve(requested: &str) -> (&'static str, &'static SkillSpec) {
    let upper = requested.trim().to_uppercase();
    SKILLS
        .iter()
        .find(|(code, _)| *code == upper)
        .or_else(|| SKILLS.iter().find(|(code, _)| *code == DEFAULT_SKILL))
        .map_or((DEFAULT_SKILL, &FALLBACK), |(code, spec)| (*code, spec))
}

// Unreachable while NAV_FIND is in the table; keeps `resolve` total.
static FALLBACK: SkillSpec = SkillSpec::basic(
    "Find a door, sign, counter, exit, elevator, or restroom and guide the user there with verification.",
    "R1",
    "The target is confirmed and the user is positioned at it.",
);
