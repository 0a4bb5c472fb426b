//! # vista-session
//!
//! Safety-oriented conversation state for one live session.
//!
//! - **Catalog**: [`catalog`] maps skill codes to [`SkillSpec`]s
//! - **Policy**: [`TriggerPolicy`] holds the refusal, caution, and frame-gate phrase tables
//! - **State machine**: [`SessionState`] tracks phase, risk mode, and confirmations,
//!   and produces the opening prompt and the closing [`SessionSummary`]

#![deny(unsafe_code)]

pub mod catalog;
pub mod notes;
pub mod policy;
pub mod prompts;
pub mod state;

pub use catalog::SkillSpec;
pub use policy::{PolicyError, TriggerPolicy};
pub use state::{MAX_SUMMARY_BULLETS, SessionState, SessionSummary};
