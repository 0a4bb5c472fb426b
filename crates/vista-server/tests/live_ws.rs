//! End-to-end `/ws/live` tests against a scripted upstream bridge.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt as _, StreamExt as _};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use vista_core::LiveEvent;
use vista_live::queue::{EventReceiver, EventSender};
use vista_live::{EventStream, LiveError, LiveTransport, event_queue};
use vista_server::{BridgeFactory, BridgeRequest, ServerConfig, VistaServer};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ─────────────────────────────────────────────────────────────────────────────
// Fake bridge
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Script {
    initial: Vec<LiveEvent>,
    end_after_initial: bool,
    fail_connect: bool,
}

struct FakeBridge {
    script: Script,
    request: BridgeRequest,
    sender: EventSender,
    receiver: Mutex<Option<EventReceiver>>,
    audio: Mutex<Vec<Vec<u8>>>,
    images: Mutex<Vec<Vec<u8>>>,
    texts: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl FakeBridge {
    fn new(script: Script, request: BridgeRequest) -> Self {
        let (sender, receiver) = event_queue();
        Self {
            script,
            request,
            sender,
            receiver: Mutex::new(Some(receiver)),
            audio: Mutex::default(),
            images: Mutex::default(),
            texts: Mutex::default(),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LiveTransport for FakeBridge {
    async fn connect(&self) -> vista_live::Result<()> {
        if self.script.fail_connect {
            return Err(LiveError::Handshake("upstream refused".into()));
        }
        for event in &self.script.initial {
            let _ = self.sender.push(event.clone());
        }
        if self.script.end_after_initial {
            let _ = self.sender.finish();
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.sender.finish();
    }

    async fn send_audio(&self, pcm: &[u8]) -> vista_live::Result<()> {
        self.audio.lock().push(pcm.to_vec());
        Ok(())
    }

    async fn send_image_jpeg(&self, jpeg: &[u8]) -> vista_live::Result<()> {
        self.images.lock().push(jpeg.to_vec());
        Ok(())
    }

    async fn send_text(&self, text: &str, _role: &str) -> vista_live::Result<()> {
        self.texts.lock().push(text.to_string());
        Ok(())
    }

    fn events(&self) -> vista_live::Result<EventStream> {
        self.receiver
            .lock()
            .take()
            .map(EventReceiver::into_stream)
            .ok_or(LiveError::StreamTaken)
    }

    fn active_region(&self) -> Option<String> {
        Some("us-central1".into())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

#[derive(Default)]
struct FakeFactory {
    script: Script,
    created: Mutex<Vec<Arc<FakeBridge>>>,
}

impl FakeFactory {
    fn bridge(&self) -> Arc<FakeBridge> {
        Arc::clone(self.created.lock().last().expect("no bridge created"))
    }
}

impl BridgeFactory for FakeFactory {
    fn create(&self, request: &BridgeRequest) -> Arc<dyn LiveTransport> {
        let bridge = Arc::new(FakeBridge::new(self.script.clone(), request.clone()));
        self.created.lock().push(Arc::clone(&bridge));
        bridge
    }

    fn managed_runtime_available(&self) -> bool {
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

struct Harness {
    server: VistaServer,
    factory: Arc<FakeFactory>,
    base: String,
}

async fn start(script: Script) -> Harness {
    let factory = Arc::new(FakeFactory {
        script,
        ..FakeFactory::default()
    });
    let server = VistaServer::new(
        ServerConfig::default(),
        Arc::clone(&factory) as Arc<dyn BridgeFactory>,
    );
    let (addr, _handle) = server.listen().await.unwrap();
    Harness {
        server,
        factory,
        base: format!("ws://{addr}/ws/live"),
    }
}

impl Harness {
    async fn open(&self, query: &str) -> Client {
        let (ws, _) = connect_async(format!("{}?{query}", self.base)).await.unwrap();
        ws
    }

    async fn open_session(&self, mode: &str) -> Client {
        let id = uuid::Uuid::new_v4();
        self.open(&format!("token=t&session_id={id}&mode={mode}")).await
    }
}

/// Next JSON message, or `None` once the server closes the socket.
async fn recv(ws: &mut Client) -> Option<Value> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for server message");
        match msg {
            Some(Ok(Message::Text(text))) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            Some(Ok(Message::Close(_)) | Err(_)) | None => return None,
            Some(Ok(_)) => {}
        }
    }
}

async fn recv_type(ws: &mut Client, ty: &str) -> Value {
    let msg = recv(ws).await.unwrap_or_else(|| panic!("socket closed before {ty}"));
    assert_eq!(msg["type"], ty, "unexpected message: {msg}");
    msg
}

async fn send(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

async fn drain_until_closed(ws: &mut Client) -> Vec<Value> {
    let mut rest = Vec::new();
    while let Some(msg) = recv(ws).await {
        rest.push(msg);
    }
    rest
}

// ─────────────────────────────────────────────────────────────────────────────
// Admission
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_session_id_is_rejected() {
    let h = start(Script::default()).await;
    let mut ws = h.open("token=t&session_id=not-a-uuid").await;

    let msg = recv_type(&mut ws, "error").await;
    assert_eq!(msg["message"], "session_id must be a valid UUID");
    assert!(recv(&mut ws).await.is_none());
    assert!(h.factory.created.lock().is_empty());
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let h = start(Script::default()).await;
    let id = uuid::Uuid::new_v4();
    let mut ws = h.open(&format!("session_id={id}")).await;

    let msg = recv_type(&mut ws, "error").await;
    assert_eq!(msg["message"], "Missing token or session_id");
    assert!(recv(&mut ws).await.is_none());
}

#[tokio::test]
async fn connect_failure_is_reported_and_closes() {
    let h = start(Script {
        fail_connect: true,
        ..Script::default()
    })
    .await;
    let mut ws = h.open_session("NAV_FIND").await;

    let msg = recv_type(&mut ws, "error").await;
    let message = msg["message"].as_str().unwrap();
    assert!(message.starts_with("Failed to connect:"), "{message}");
    assert!(message.contains("upstream refused"));
    assert!(recv(&mut ws).await.is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Session flow
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn audio_confirm_stop_produces_summary() {
    let h = start(Script {
        initial: vec![LiveEvent::text("Hold still and look ahead.")],
        ..Script::default()
    })
    .await;
    let mut ws = h.open_session("NAV_FIND").await;

    let status = recv_type(&mut ws, "server.status").await;
    assert_eq!(status["state"], "connected");
    assert_eq!(status["mode"], "NORMAL");
    assert_eq!(status["skill"], "NAV_FIND");

    let text = recv_type(&mut ws, "server.text").await;
    assert_eq!(text["text"], "Hold still and look ahead.");

    send(&mut ws, json!({"type": "client.audio", "data_b64": "AQI="})).await;
    send(&mut ws, json!({"type": "client.confirm"})).await;
    send(&mut ws, json!({"type": "client.stop"})).await;

    let summary = recv_type(&mut ws, "server.summary").await;
    assert_eq!(summary["scenario"], "NAV_FIND");
    let bullets: Vec<&str> = summary["bullets"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(bullets.iter().any(|b| b.contains("Confirmations received: 1")));
    assert!(bullets.contains(&"The session stayed audio-only."));
    assert!(drain_until_closed(&mut ws).await.is_empty());

    let bridge = h.factory.bridge();
    assert_eq!(*bridge.audio.lock(), vec![vec![1u8, 2]]);
    let texts = bridge.texts.lock().clone();
    assert!(texts[0].starts_with("I am starting a NAV_FIND session"));
    assert!(texts.iter().any(|t| t.starts_with("Yes, I finished that step.")));
    assert!(bridge.closed.load(Ordering::SeqCst));
    assert_eq!(bridge.request.skill, "NAV_FIND");
}

#[tokio::test]
async fn video_frames_are_forwarded_and_summarized() {
    let h = start(Script::default()).await;
    let mut ws = h.open_session("READ_TEXT").await;
    let _ = recv_type(&mut ws, "server.status").await;

    send(&mut ws, json!({"type": "client.video", "data_b64": "/9j/"})).await;
    send(&mut ws, json!({"type": "client.stop"})).await;

    let summary = recv_type(&mut ws, "server.summary").await;
    let bullets = summary["bullets"].to_string();
    assert!(bullets.contains("Camera frames were shared during the session."));

    let bridge = h.factory.bridge();
    assert_eq!(*bridge.images.lock(), vec![vec![0xFFu8, 0xD8, 0xFF]]);
}

#[tokio::test]
async fn invalid_base64_reports_error_and_keeps_session() {
    let h = start(Script::default()).await;
    let mut ws = h.open_session("NAV_FIND").await;
    let _ = recv_type(&mut ws, "server.status").await;

    send(&mut ws, json!({"type": "client.audio", "data_b64": "!!!not base64"})).await;
    let err = recv_type(&mut ws, "error").await;
    assert!(err["message"].as_str().unwrap().starts_with("Invalid base64 payload"));

    send(&mut ws, json!({"type": "client.stop"})).await;
    let _ = recv_type(&mut ws, "server.summary").await;
    assert!(h.factory.bridge().audio.lock().is_empty());
}

#[tokio::test]
async fn invalid_json_reports_error() {
    let h = start(Script::default()).await;
    let mut ws = h.open_session("NAV_FIND").await;
    let _ = recv_type(&mut ws, "server.status").await;

    ws.send(Message::Text("not json".into())).await.unwrap();
    let err = recv_type(&mut ws, "error").await;
    assert_eq!(err["message"], "Invalid JSON message");

    // Unknown types are ignored
    send(&mut ws, json!({"type": "client.wave"})).await;
    send(&mut ws, json!({"type": "client.stop"})).await;
    let _ = recv_type(&mut ws, "server.summary").await;
}

#[tokio::test]
async fn empty_audio_is_ignored() {
    let h = start(Script::default()).await;
    let mut ws = h.open_session("NAV_FIND").await;
    let _ = recv_type(&mut ws, "server.status").await;

    send(&mut ws, json!({"type": "client.audio"})).await;
    send(&mut ws, json!({"type": "client.stop"})).await;
    let _ = recv_type(&mut ws, "server.summary").await;
    assert!(h.factory.bridge().audio.lock().is_empty());
}

#[tokio::test]
async fn upstream_end_sends_summary_and_closes() {
    let h = start(Script {
        end_after_initial: true,
        ..Script::default()
    })
    .await;
    let mut ws = h.open_session("NAV_FIND").await;

    let _ = recv_type(&mut ws, "server.status").await;
    let _ = recv_type(&mut ws, "server.summary").await;
    assert!(drain_until_closed(&mut ws).await.is_empty());
    assert!(h.factory.bridge().closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn caution_skill_announces_caution_after_connect() {
    let h = start(Script::default()).await;
    let mut ws = h.open_session("COOKING_ASSIST").await;

    let connected = recv_type(&mut ws, "server.status").await;
    assert_eq!(connected["state"], "connected");
    assert_eq!(connected["mode"], "CAUTION");
    let caution = recv_type(&mut ws, "server.status").await;
    assert_eq!(caution["state"], "caution");
    assert_eq!(caution["skill"], "COOKING_ASSIST");

    let texts = h.factory.bridge().texts.lock().clone();
    assert!(texts[0].contains("CAUTION mode"));
}

#[tokio::test]
async fn unknown_mode_falls_back_to_default_skill() {
    let h = start(Script::default()).await;
    let mut ws = h.open_session("JUGGLING").await;

    let status = recv_type(&mut ws, "server.status").await;
    assert_eq!(status["skill"], "NAV_FIND");
    assert_eq!(h.factory.bridge().request.skill, "NAV_FIND");
}

#[tokio::test]
async fn refusal_text_escalates_status() {
    let h = start(Script {
        initial: vec![LiveEvent::text("Go ahead and cross the road now.")],
        ..Script::default()
    })
    .await;
    let mut ws = h.open_session("NAV_FIND").await;

    let _ = recv_type(&mut ws, "server.status").await;
    let _ = recv_type(&mut ws, "server.text").await;
    let refuse = recv_type(&mut ws, "server.status").await;
    assert_eq!(refuse["state"], "refuse");
    assert_eq!(refuse["mode"], "REFUSE");

    // Nothing to confirm once refused
    send(&mut ws, json!({"type": "client.confirm"})).await;
    send(&mut ws, json!({"type": "client.stop"})).await;
    let _ = recv_type(&mut ws, "server.summary").await;
    assert_eq!(h.factory.bridge().texts.lock().len(), 1);
}

#[tokio::test]
async fn upstream_error_events_pass_through() {
    let h = start(Script {
        initial: vec![LiveEvent::error("429: quota exhausted")],
        ..Script::default()
    })
    .await;
    let mut ws = h.open_session("NAV_FIND").await;

    let _ = recv_type(&mut ws, "server.status").await;
    let err = recv_type(&mut ws, "error").await;
    assert_eq!(err["message"], "429: quota exhausted");
}

#[tokio::test]
async fn server_shutdown_stops_open_sessions_with_summary() {
    let h = start(Script::default()).await;
    let mut ws = h.open_session("NAV_FIND").await;
    let _ = recv_type(&mut ws, "server.status").await;

    h.server.shutdown().shutdown();
    let _ = recv_type(&mut ws, "server.summary").await;
    assert!(drain_until_closed(&mut ws).await.is_empty());
}

#[tokio::test]
async fn client_disconnect_closes_bridge() {
    let h = start(Script::default()).await;
    let mut ws = h.open_session("NAV_FIND").await;
    let _ = recv_type(&mut ws, "server.status").await;
    assert_eq!(h.server.connection_count(), 1);

    ws.close(None).await.unwrap();
    drop(ws);

    let bridge = h.factory.bridge();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !bridge.closed.load(Ordering::SeqCst) || h.server.connection_count() != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("bridge was not closed after client disconnect");
}
