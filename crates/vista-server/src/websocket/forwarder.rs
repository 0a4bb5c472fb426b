//! Forwarder task: drains upstream events to the client and owns the
//! session state machine.
//!
//! Client-loop triggers arrive as [`Command`]s so every state transition is
//! applied on this one task, in order with upstream text.

use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use vista_core::constants::ROLE_USER;
use vista_core::{LiveEvent, ServerMessage};
use vista_live::{EventStream, LiveTransport};
use vista_session::SessionState;

/// Trigger sent from the client loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// A camera frame was received.
    Video,
    /// The user confirmed the pending step.
    Confirm,
    /// The user (or shutdown) ended the session.
    Stop,
}

/// Why the forwarder stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// A stop command arrived; summary sent.
    Stopped,
    /// The upstream event stream terminated; summary sent.
    UpstreamEnded,
    /// The client side went away; no summary sent.
    ClientGone,
}

/// Owns [`SessionState`] for the lifetime of one connection.
pub struct Forwarder {
    state: SessionState,
    bridge: Arc<dyn LiveTransport>,
    out: mpsc::Sender<ServerMessage>,
}

impl Forwarder {
    /// New forwarder writing to `out`.
    pub fn new(
        state: SessionState,
        bridge: Arc<dyn LiveTransport>,
        out: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self { state, bridge, out }
    }

    /// Run until stop, upstream termination, or client loss.
    pub async fn run(
        mut self,
        mut events: EventStream,
        mut commands: mpsc::Receiver<Command>,
    ) -> (SessionState, Exit) {
        let exit = loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Video) => self.state.on_client_video(),
                    Some(Command::Confirm) => self.confirm().await,
                    Some(Command::Stop) => break Exit::Stopped,
                    None => break Exit::ClientGone,
                },
                event = events.next() => match event {
                    Some(event) => {
                        if !self.forward(event).await {
                            break Exit::ClientGone;
                        }
                    }
                    None => break Exit::UpstreamEnded,
                },
            }
        };

        if exit != Exit::ClientGone {
            let summary = self.state.summary_payload();
            let _ = self
                .out
                .send(ServerMessage::Summary {
                    scenario: summary.scenario,
                    bullets: summary.bullets,
                })
                .await;
        }
        debug!(?exit, phase = %self.state.phase(), mode = %self.state.risk_mode(), "forwarder finished");
        (self.state, exit)
    }

    async fn confirm(&mut self) {
        let Some(prompt) = self.state.on_client_confirm() else {
            return;
        };
        if let Err(e) = self.bridge.send_text(prompt, ROLE_USER).await {
            warn!(error = %e, "failed to forward confirmation");
        }
    }

    /// Observe and forward one event, then any status events it caused.
    async fn forward(&mut self, event: LiveEvent) -> bool {
        let follow_up = match &event {
            LiveEvent::Text { text } => self.state.on_model_text(text),
            LiveEvent::Audio { .. } => {
                self.state.on_model_audio();
                Vec::new()
            }
            LiveEvent::Status { .. } | LiveEvent::Error { .. } => Vec::new(),
        };
        // Upstream status events carry no session context
        let event = match event {
            LiveEvent::Status { state, .. } => {
                LiveEvent::status(state, self.state.risk_mode(), self.state.skill())
            }
            other => other,
        };

        for event in std::iter::once(event).chain(follow_up) {
            if self.out.send(ServerMessage::from(event)).await.is_err() {
                return false;
            }
        }
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
