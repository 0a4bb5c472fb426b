//! # vista-server
//!
//! Axum server exposing `/health` and the `/ws/live` endpoint.
//!
//! Each `/ws/live` connection owns one upstream bridge and one session state
//! machine. The client loop decodes `client.*` messages and forwards media
//! upstream; a forwarder task drains upstream events, applies state
//! transitions, and writes `server.*` messages back.

#![deny(unsafe_code)]

pub mod config;
pub mod directory;
pub mod errors;
pub mod factory;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use directory::{
    DirectoryError, PassthroughDirectory, ResolvedSession, SessionDirectory, SessionRequest,
};
pub use errors::ServerError;
pub use factory::{BridgeFactory, BridgeRequest, LiveBridgeFactory};
pub use server::{AppState, VistaServer};
pub use shutdown::{SessionGuard, ShutdownCoordinator};
