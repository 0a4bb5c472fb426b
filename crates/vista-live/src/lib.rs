//! # vista-live
//!
//! Upstream side of the Vista live-session bridge.
//!
//! - **Façade**: [`LiveBridge`] picks the managed runtime or the direct
//!   transport at connect time
//! - **Direct transport**: [`DirectTransport`], raw websocket client with
//!   region failover and frame normalization
//! - **Managed runtime**: [`ManagedTransport`] over a [`ManagedRuntime`]
//! - **Plumbing**: [`queue`] (event queue with one-shot terminator),
//!   [`throttle`] (camera frame rate limit), [`regions`] (candidate list)

#![deny(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod direct;
pub mod error;
pub mod frames;
pub mod managed;
pub mod protocol;
pub mod queue;
pub mod regions;
pub mod throttle;
pub mod transport;

pub use bridge::LiveBridge;
pub use config::LiveConfig;
pub use direct::DirectTransport;
pub use error::{LiveError, Result};
pub use frames::RECONNECT_ADVISORY;
pub use managed::{
    Content, ContentPart, ManagedRuntime, ManagedTransport, MediaBlob, RuntimeEnvironment,
    RuntimeEvent, RuntimeSession, RuntimeSetup, SessionKey,
};
pub use queue::{EventStream, event_queue};
pub use transport::LiveTransport;
