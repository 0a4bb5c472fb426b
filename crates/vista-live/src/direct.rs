//! Direct websocket transport.
//!
//! Speaks the model's bidirectional protocol over one socket:
//! - connect walks the candidate regions, sending the setup handshake and
//!   waiting (bounded) for the acknowledgement
//! - a reader task normalizes inbound frames into the event queue
//! - outbound sends share the socket's write half behind an async mutex

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{FutureExt as _, Sink, SinkExt as _, StreamExt as _};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest as _;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, instrument, warn};
use vista_auth::CredentialProvider;
use vista_core::LiveEvent;
use vista_core::constants::{INPUT_AUDIO_MIME, INPUT_IMAGE_MIME};

use crate::config::LiveConfig;
use crate::error::{LiveError, Result};
use crate::frames::normalize_frame;
use crate::protocol;
use crate::queue::{EventReceiver, EventSender, EventStream, event_queue};
use crate::regions::candidate_regions;
use crate::throttle::FrameThrottle;
use crate::transport::LiveTransport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Upper bound on closing the socket during shutdown. A send stuck on a
/// stalled upstream holds the write half, so the close cannot wait for it.
const SOCKET_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// How an inbound websocket message should be handled.
enum Inbound<'a> {
    Json(&'a str),
    Closed,
    Skip,
}

fn classify(msg: &Message) -> Inbound<'_> {
    match msg {
        Message::Text(text) => Inbound::Json(text.as_str()),
        // Binary frames are JSON too; never raw audio
        Message::Binary(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Inbound::Json(text),
            Err(_) => {
                debug!(len = bytes.len(), "dropping non-UTF-8 binary frame");
                Inbound::Skip
            }
        },
        Message::Close(_) => Inbound::Closed,
        _ => Inbound::Skip,
    }
}

/// Lock and close `sink`, giving up after `limit`. Returns `false` on timeout.
async fn close_within<S>(sink: &tokio::sync::Mutex<S>, limit: Duration) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let close = async {
        let mut sink = sink.lock().await;
        if let Err(e) = sink.close().await {
            debug!(error = %e, "socket close");
        }
    };
    tokio::time::timeout(limit, close).await.is_ok()
}

/// One open upstream socket plus its reader task and event queue.
struct Connection {
    region: String,
    sink: tokio::sync::Mutex<WsSink>,
    events: EventSender,
    receiver: Mutex<Option<EventReceiver>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Connection {
    fn start(
        region: String,
        sink: WsSink,
        source: WsSource,
        pending: Vec<LiveEvent>,
        skill: String,
    ) -> Arc<Self> {
        let (events, receiver) = event_queue();
        for event in pending {
            let _ = events.push(event);
        }
        let conn = Arc::new(Self {
            region,
            sink: tokio::sync::Mutex::new(sink),
            events,
            receiver: Mutex::new(Some(receiver)),
            reader: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        let handle = tokio::spawn(read_loop(Arc::clone(&conn), source, skill));
        *conn.reader.lock() = Some(handle);
        conn
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn send_json(&self, value: &serde_json::Value) -> Result<()> {
        if self.is_closed() {
            return Err(LiveError::NotConnected);
        }
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(value.to_string().into())).await?;
        Ok(())
    }

    async fn close_socket(&self) {
        if !close_within(&self.sink, SOCKET_CLOSE_TIMEOUT).await {
            warn!(region = %self.region, "socket close timed out; abandoning write half");
        }
    }

    /// Cancel the reader, close the socket, then terminate the queue.
    async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let reader = self.reader.lock().take();
        if let Some(handle) = reader {
            handle.abort();
            if let Some(e) = handle.await.err().filter(tokio::task::JoinError::is_panic) {
                warn!(error = %e, "live reader task panicked");
            }
        }
        self.close_socket().await;
        let _ = self.events.finish();
    }

    /// Synchronous teardown for drop paths.
    fn abort(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(handle) = self.reader.lock().take() {
            handle.abort();
        }
        let _ = self.events.finish();
    }
}

async fn read_loop(conn: Arc<Connection>, mut source: WsSource, skill: String) {
    let result = AssertUnwindSafe(pump_frames(&conn, &mut source, &skill))
        .catch_unwind()
        .await;
    match result {
        Ok(Ok(())) => debug!(region = %conn.region, "upstream stream ended"),
        Ok(Err(e)) => {
            metrics::counter!("live_reader_errors_total", "transport" => "direct").increment(1);
            warn!(region = %conn.region, error = %e, "live reader failed");
            let _ = conn.events.push(LiveEvent::error(format!("Live session error: {e}")));
        }
        Err(_) => {
            metrics::counter!("live_reader_errors_total", "transport" => "direct").increment(1);
            error!(region = %conn.region, "live reader panicked");
            let _ = conn.events.push(LiveEvent::error("Live session reader crashed"));
        }
    }
    conn.closed.store(true, Ordering::Release);
    conn.close_socket().await;
    let _ = conn.events.finish();
}

async fn pump_frames(conn: &Connection, source: &mut WsSource, skill: &str) -> Result<()> {
    while let Some(msg) = source.next().await {
        let msg = msg?;
        let raw = match classify(&msg) {
            Inbound::Json(raw) => raw,
            Inbound::Closed => break,
            Inbound::Skip => continue,
        };
        let outcome = match normalize_frame(raw, skill) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(error = %e, "dropping malformed upstream frame");
                continue;
            }
        };
        for event in outcome.events {
            let _ = conn.events.push(event);
        }
        if outcome.terminate {
            info!(region = %conn.region, "upstream requested reconnect; ending session");
            break;
        }
    }
    Ok(())
}

/// Read until the setup acknowledgement, buffering anything that arrives first.
async fn await_setup_ack(
    source: &mut WsSource,
    skill: &str,
    pending: &mut Vec<LiveEvent>,
) -> Result<()> {
    while let Some(msg) = source.next().await {
        let msg = msg?;
        let raw = match classify(&msg) {
            Inbound::Json(raw) => raw,
            Inbound::Closed => break,
            Inbound::Skip => continue,
        };
        let Ok(outcome) = normalize_frame(raw, skill) else {
            continue;
        };
        if outcome.setup_complete {
            pending.extend(outcome.events);
            return Ok(());
        }
        if let Some(LiveEvent::Error { message }) = outcome
            .events
            .iter()
            .find(|e| matches!(e, LiveEvent::Error { .. }))
        {
            return Err(LiveError::Handshake(message.clone()));
        }
        pending.extend(outcome.events);
    }
    Err(LiveError::Handshake(
        "upstream closed before setup completed".into(),
    ))
}

/// Raw-protocol transport to the model's websocket endpoint.
pub struct DirectTransport {
    config: LiveConfig,
    credentials: Arc<dyn CredentialProvider>,
    throttle: FrameThrottle,
    connection: Mutex<Option<Arc<Connection>>>,
}

impl DirectTransport {
    /// Transport using `credentials` for bearer tokens.
    pub fn new(config: LiveConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        let throttle = FrameThrottle::new(config.video_min_interval);
        Self {
            config,
            credentials,
            throttle,
            connection: Mutex::new(None),
        }
    }

    fn live(&self) -> Result<Arc<Connection>> {
        self.connection
            .lock()
            .clone()
            .ok_or(LiveError::NotConnected)
    }

    async fn open_region(
        &self,
        region: &str,
        project: &str,
    ) -> Result<(WsSink, WsSource, Vec<LiveEvent>)> {
        let token = self
            .credentials
            .access_token()
            .await
            .map_err(LiveError::Credentials)?;

        let mut request = self.config.endpoint_for(region).into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| LiveError::Handshake(format!("invalid bearer token: {e}")))?;
        let _ = request.headers_mut().insert(AUTHORIZATION, bearer);

        let (ws, _response) = connect_async(request).await?;
        let (mut sink, mut source) = ws.split();

        match self.handshake(&mut sink, &mut source, project, region).await {
            Ok(pending) => Ok((sink, source, pending)),
            Err(e) => {
                let _ = sink.close().await;
                Err(e)
            }
        }
    }

    async fn handshake(
        &self,
        sink: &mut WsSink,
        source: &mut WsSource,
        project: &str,
        region: &str,
    ) -> Result<Vec<LiveEvent>> {
        let setup = protocol::setup_message(&self.config, project, region);
        sink.send(Message::Text(setup.to_string().into())).await?;

        let mut pending = Vec::new();
        let ack = tokio::time::timeout(
            self.config.setup_timeout,
            await_setup_ack(source, &self.config.skill, &mut pending),
        )
        .await;
        match ack {
            Ok(result) => result?,
            Err(_) => warn!(
                region,
                timeout_ms = u64::try_from(self.config.setup_timeout.as_millis()).unwrap_or(u64::MAX),
                "setup acknowledgement timed out; proceeding"
            ),
        }
        Ok(pending)
    }
}

#[async_trait]
impl LiveTransport for DirectTransport {
    #[instrument(skip_all, fields(skill = %self.config.skill, model = %self.config.model_id))]
    async fn connect(&self) -> Result<()> {
        self.close().await;
        let project = self
            .config
            .project()
            .ok_or(LiveError::MissingProject)?
            .to_string();
        let regions = candidate_regions(
            &self.config.location,
            self.config.fallback_location.as_deref(),
        );

        let mut last_error = None;
        for region in &regions {
            match self.open_region(region, &project).await {
                Ok((sink, source, pending)) => {
                    let conn = Connection::start(
                        region.clone(),
                        sink,
                        source,
                        pending,
                        self.config.skill.clone(),
                    );
                    self.throttle.reset();
                    *self.connection.lock() = Some(conn);
                    metrics::counter!("live_connect_total", "transport" => "direct", "status" => "ok")
                        .increment(1);
                    info!(region = %region, "live session connected");
                    return Ok(());
                }
                Err(err @ LiveError::Credentials(_)) => {
                    metrics::counter!("live_connect_total", "transport" => "direct", "status" => "error")
                        .increment(1);
                    return Err(err);
                }
                Err(err) => {
                    warn!(region = %region, error = %err, "region attempt failed");
                    last_error = Some(err);
                }
            }
        }

        metrics::counter!("live_connect_total", "transport" => "direct", "status" => "error")
            .increment(1);
        Err(LiveError::Connect {
            regions,
            source: Box::new(
                last_error.unwrap_or_else(|| LiveError::Handshake("no candidate regions".into())),
            ),
        })
    }

    async fn close(&self) {
        let conn = self.connection.lock().take();
        if let Some(conn) = conn {
            conn.shutdown().await;
            info!(region = %conn.region, "live session closed");
        }
    }

    async fn send_audio(&self, pcm: &[u8]) -> Result<()> {
        let conn = self.live()?;
        conn.send_json(&protocol::realtime_media(INPUT_AUDIO_MIME, pcm))
            .await
    }

    async fn send_image_jpeg(&self, jpeg: &[u8]) -> Result<()> {
        let conn = self.live()?;
        if conn.is_closed() {
            return Err(LiveError::NotConnected);
        }
        if !self.throttle.try_acquire() {
            metrics::counter!("live_frames_dropped_total", "transport" => "direct").increment(1);
            debug!("dropping camera frame inside throttle window");
            return Ok(());
        }
        conn.send_json(&protocol::realtime_media(INPUT_IMAGE_MIME, jpeg))
            .await
    }

    async fn send_text(&self, text: &str, role: &str) -> Result<()> {
        let conn = self.live()?;
        conn.send_json(&protocol::client_text_turn(text, role)).await
    }

    fn events(&self) -> Result<EventStream> {
        let conn = self.live()?;
        let receiver = conn.receiver.lock().take().ok_or(LiveError::StreamTaken)?;
        Ok(receiver.into_stream())
    }

    fn active_region(&self) -> Option<String> {
        self.connection.lock().as_ref().map(|c| c.region.clone())
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

impl Drop for DirectTransport {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.get_mut().take() {
            conn.abort();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
