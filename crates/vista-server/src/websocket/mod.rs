//! Live-session WebSocket handling.

pub mod forwarder;
pub mod protocol;
pub mod session;
