//! WebSocket session lifecycle for `/ws/live`, from upgrade through disconnect.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitStream;
use futures::{SinkExt as _, StreamExt as _};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use vista_core::constants::{DEFAULT_SKILL, ROLE_USER};
use vista_core::{ServerMessage, StatusState};
use vista_live::LiveTransport;
use vista_session::SessionState;

use super::forwarder::{Command, Exit, Forwarder};
use super::protocol::{ClientMessage, LiveQuery, decode_payload, parse_client_message};
use crate::directory::{ResolvedSession, SessionRequest};
use crate::factory::BridgeRequest;
use crate::server::AppState;

const OUTBOUND_CAPACITY: usize = 256;
const COMMAND_CAPACITY: usize = 64;

/// Validated query parameters.
struct Admission {
    token: String,
    session_id: Uuid,
    mode: String,
    goal: Option<String>,
}

fn admit(query: LiveQuery) -> Result<Admission, &'static str> {
    let token = query.token.filter(|t| !t.is_empty());
    let session_id = query.session_id.filter(|s| !s.is_empty());
    let (Some(token), Some(session_id)) = (token, session_id) else {
        return Err("Missing token or session_id");
    };
    let session_id =
        Uuid::parse_str(&session_id).map_err(|_| "session_id must be a valid UUID")?;
    Ok(Admission {
        token,
        session_id,
        mode: query
            .mode
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SKILL.to_string()),
        goal: query.goal,
    })
}

/// Run one live session.
///
/// 1. Validates the query and resolves the session through the directory
/// 2. Connects a bridge and sends the connected status and opening prompt
/// 3. Runs the client loop alongside the [`Forwarder`]
/// 4. Closes the bridge, then the socket once queued messages are flushed
#[instrument(skip_all, fields(session_id = tracing::field::Empty, skill = tracing::field::Empty))]
pub async fn run_live_session(socket: WebSocket, query: LiveQuery, state: AppState) {
    let _guard = state.shutdown.session_guard();
    let (mut ws_tx, ws_rx) = socket.split();

    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CAPACITY);
    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let Ok(json) = serde_json::to_string(&msg) else {
                continue;
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    if let Some((session, bridge, live_state)) = open(query, &state, &out_tx).await {
        drive(ws_rx, &bridge, live_state, &session, &state, out_tx).await;
    } else {
        drop(out_tx);
    }

    if let Err(e) = writer.await {
        warn!(error = %e, "client writer task failed");
    }
    info!("live session ended");
}

/// Admission, directory lookup, and upstream connect.
async fn open(
    query: LiveQuery,
    state: &AppState,
    out: &mpsc::Sender<ServerMessage>,
) -> Option<(ResolvedSession, Arc<dyn LiveTransport>, SessionState)> {
    let admission = match admit(query) {
        Ok(admission) => admission,
        Err(message) => {
            let _ = out.send(ServerMessage::error(message)).await;
            return None;
        }
    };
    let span = tracing::Span::current();
    let _ = span.record("session_id", tracing::field::display(&admission.session_id));

    let request = SessionRequest {
        token: admission.token,
        session_id: admission.session_id,
        goal: admission.goal,
    };
    let session = match state.directory.resolve(&request).await {
        Ok(session) => session,
        Err(e) => {
            let _ = out.send(ServerMessage::error(e.to_string())).await;
            return None;
        }
    };

    let mut live_state =
        SessionState::with_policy(&admission.mode, session.goal.as_deref(), Arc::clone(&state.policy));
    let _ = span.record("skill", live_state.skill());

    let bridge = state.factory.create(&BridgeRequest {
        skill: live_state.skill().to_string(),
        user_key: session.user_key.clone(),
        session_key: session.session_key.clone(),
    });
    if let Err(e) = bridge.connect().await {
        warn!(error = %e, "upstream connect failed");
        let _ = out
            .send(ServerMessage::error(format!("Failed to connect: {e}")))
            .await;
        return None;
    }
    info!(region = ?bridge.active_region(), "upstream connected");

    let _ = out
        .send(ServerMessage::Status {
            state: StatusState::Connected,
            mode: live_state.risk_mode(),
            skill: live_state.skill().to_string(),
        })
        .await;
    for event in live_state.on_connect_events() {
        let _ = out.send(event.into()).await;
    }
    if let Err(e) = bridge.send_text(&live_state.opening_prompt(), ROLE_USER).await {
        warn!(error = %e, "failed to send opening prompt");
    }

    Some((session, bridge, live_state))
}

/// Client loop plus forwarder until either side ends the session.
async fn drive(
    mut ws_rx: SplitStream<WebSocket>,
    bridge: &Arc<dyn LiveTransport>,
    live_state: SessionState,
    session: &ResolvedSession,
    state: &AppState,
    out: mpsc::Sender<ServerMessage>,
) {
    let events = match bridge.events() {
        Ok(events) => events,
        Err(e) => {
            let _ = out.send(ServerMessage::error(e.to_string())).await;
            bridge.close().await;
            return;
        }
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
    let done = CancellationToken::new();
    let forwarder = tokio::spawn({
        let forwarder = Forwarder::new(live_state, Arc::clone(bridge), out.clone());
        let done = done.clone();
        async move {
            let result = forwarder.run(events, cmd_rx).await;
            done.cancel();
            result
        }
    });

    let client = ClientLoop {
        bridge: Arc::clone(bridge),
        commands: cmd_tx,
        out,
    };
    client.run(&mut ws_rx, &done, &state.shutdown.token()).await;

    match forwarder.await {
        Ok((live_state, exit)) => {
            if exit != Exit::ClientGone {
                state
                    .directory
                    .record_completion(session, &live_state.summary_payload())
                    .await;
            }
        }
        Err(e) => warn!(error = %e, "forwarder task failed"),
    }
    bridge.close().await;
}

struct ClientLoop {
    bridge: Arc<dyn LiveTransport>,
    commands: mpsc::Sender<Command>,
    out: mpsc::Sender<ServerMessage>,
}

impl ClientLoop {
    /// Returns when the client stops or disconnects, the forwarder
    /// finishes, or the server shuts down. Drops the command sender on exit.
    async fn run(
        self,
        ws_rx: &mut SplitStream<WebSocket>,
        done: &CancellationToken,
        shutdown: &CancellationToken,
    ) {
        loop {
            let msg = tokio::select! {
                msg = ws_rx.next() => msg,
                () = done.cancelled() => break,
                () = shutdown.cancelled() => {
                    let _ = self.commands.send(Command::Stop).await;
                    break;
                }
            };
            let Some(Ok(msg)) = msg else {
                debug!("client disconnected");
                break;
            };
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => {
                    debug!("client sent close frame");
                    break;
                }
                // Raw binary and ping/pong carry nothing for the session
                _ => continue,
            };
            if !self.handle(text.as_str()).await {
                break;
            }
        }
    }

    /// Handle one text frame. Returns `false` once the session should end.
    async fn handle(&self, text: &str) -> bool {
        let message = match parse_client_message(text) {
            Ok(Some(message)) => message,
            Ok(None) => return true,
            Err(e) => return self.reply_error(e.to_string()).await,
        };

        match message {
            ClientMessage::Audio { data_b64 } => {
                if data_b64.is_empty() {
                    return true;
                }
                match decode_payload(&data_b64) {
                    Ok(pcm) => {
                        if let Err(e) = self.bridge.send_audio(&pcm).await {
                            debug!(error = %e, "audio not forwarded");
                        }
                        true
                    }
                    Err(e) => self.reply_error(e.to_string()).await,
                }
            }
            ClientMessage::Video { data_b64 } => {
                if data_b64.is_empty() {
                    return true;
                }
                match decode_payload(&data_b64) {
                    Ok(jpeg) => {
                        if self.commands.send(Command::Video).await.is_err() {
                            return false;
                        }
                        if let Err(e) = self.bridge.send_image_jpeg(&jpeg).await {
                            debug!(error = %e, "frame not forwarded");
                        }
                        true
                    }
                    Err(e) => self.reply_error(e.to_string()).await,
                }
            }
            ClientMessage::Confirm => self.commands.send(Command::Confirm).await.is_ok(),
            ClientMessage::Stop => {
                let _ = self.commands.send(Command::Stop).await;
                false
            }
        }
    }

    async fn reply_error(&self, message: String) -> bool {
        self.out.send(ServerMessage::error(message)).await.is_ok()
    }
}
