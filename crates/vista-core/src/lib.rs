//! # vista-core
//!
//! Shared vocabulary for the Vista live-session bridge.
//!
//! - **Events**: [`LiveEvent`], the canonical upstream event every transport normalizes into
//! - **Wire messages**: [`ServerMessage`], the downstream JSON shape sent to clients
//! - **Session enums**: [`RiskMode`], [`Phase`], [`StatusState`]
//! - **Logging**: [`logging::init_subscriber`] for the process-wide `tracing` subscriber

#![deny(unsafe_code)]

pub mod constants;
pub mod events;
pub mod logging;
pub mod session;

pub use events::{LiveEvent, ServerMessage};
pub use session::{Phase, RiskMode, StatusState};
