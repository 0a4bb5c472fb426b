//! Direct transport against an in-process websocket upstream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use async_trait::async_trait;
use futures::{SinkExt as _, StreamExt as _};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::Message;
use vista_auth::{AuthError, CredentialProvider};
use vista_core::LiveEvent;
use vista_live::{DirectTransport, LiveConfig, LiveError, LiveTransport, RECONNECT_ADVISORY};

// ─────────────────────────────────────────────────────────────────────────────
// Fake upstream
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum After {
    /// Keep reading client frames until the client closes.
    Hold,
    /// Send a close frame.
    Close,
    /// Drop the TCP stream without a closing handshake.
    Drop,
}

struct Plan {
    reject_regions: Vec<&'static str>,
    ack: bool,
    script: Vec<Message>,
    after: After,
}

impl Plan {
    fn acking(script: Vec<Message>, after: After) -> Self {
        Self {
            reject_regions: Vec::new(),
            ack: true,
            script,
            after,
        }
    }
}

struct FakeUpstream {
    addr: SocketAddr,
    received: mpsc::UnboundedReceiver<Value>,
    paths: Arc<Mutex<Vec<String>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

impl FakeUpstream {
    async fn next_frame(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .expect("timed out waiting for client frame")
            .expect("upstream channel closed")
    }
}

fn text(value: Value) -> Message {
    Message::Text(value.to_string().into())
}

async fn spawn_upstream(plan: Plan) -> FakeUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, received) = mpsc::unbounded_channel();
    let paths = Arc::new(Mutex::new(Vec::new()));
    let auth = Arc::new(Mutex::new(Vec::new()));
    let plan = Arc::new(plan);

    let _accept = tokio::spawn({
        let paths = Arc::clone(&paths);
        let auth = Arc::clone(&auth);
        async move {
            while let Ok((stream, _)) = listener.accept().await {
                let _conn = tokio::spawn(serve(
                    stream,
                    Arc::clone(&plan),
                    tx.clone(),
                    Arc::clone(&paths),
                    Arc::clone(&auth),
                ));
            }
        }
    });

    FakeUpstream {
        addr,
        received,
        paths,
        auth,
    }
}

async fn serve(
    stream: TcpStream,
    plan: Arc<Plan>,
    tx: mpsc::UnboundedSender<Value>,
    paths: Arc<Mutex<Vec<String>>>,
    auth: Arc<Mutex<Vec<String>>>,
) {
    let reject = plan.reject_regions.clone();
    let callback = move |req: &Request, resp: Response| {
        let path = req.uri().path().to_string();
        paths.lock().push(path.clone());
        if let Some(value) = req.headers().get("authorization") {
            auth.lock().push(value.to_str().unwrap_or_default().to_string());
        }
        if reject.iter().any(|r| path.ends_with(r)) {
            let mut err = ErrorResponse::new(Some("region unavailable".into()));
            *err.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
            return Err(err);
        }
        Ok(resp)
    };
    let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
        return;
    };

    if let Some(Ok(Message::Text(setup))) = ws.next().await {
        let _ = tx.send(serde_json::from_str(setup.as_str()).unwrap());
    }
    if plan.ack {
        ws.send(text(json!({"setupComplete": {}}))).await.unwrap();
    }
    for frame in &plan.script {
        ws.send(frame.clone()).await.unwrap();
    }
    match plan.after {
        After::Close => {
            let _ = ws.close(None).await;
        }
        After::Drop => drop(ws),
        After::Hold => {
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(body) = msg {
                    let _ = tx.send(serde_json::from_str(body.as_str()).unwrap());
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

struct TestToken;

#[async_trait]
impl CredentialProvider for TestToken {
    async fn access_token(&self) -> vista_auth::Result<String> {
        Ok("test-token".into())
    }
}

struct BrokenCredentials;

#[async_trait]
impl CredentialProvider for BrokenCredentials {
    async fn access_token(&self) -> vista_auth::Result<String> {
        Err(AuthError::NotConfigured("no credentials".into()))
    }
}

fn config(upstream: &FakeUpstream) -> LiveConfig {
    LiveConfig {
        project_id: Some("proj".into()),
        location: "us-central1".into(),
        fallback_location: Some("europe-west4".into()),
        endpoint_template: format!("ws://{}/ws/{{region}}", upstream.addr),
        setup_timeout: Duration::from_secs(2),
        system_instructions: "test instructions".into(),
        ..LiveConfig::default()
    }
    .for_session("NAV_FIND", "user-1", "session-1")
}

fn transport(config: LiveConfig) -> DirectTransport {
    DirectTransport::new(config, Arc::new(TestToken))
}

async fn collect(transport: &DirectTransport) -> Vec<LiveEvent> {
    tokio::time::timeout(
        Duration::from_secs(5),
        transport.events().unwrap().collect::<Vec<_>>(),
    )
    .await
    .expect("event stream did not terminate")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn connects_and_streams_normalized_events() {
    let script = vec![
        text(json!({"serverContent": {"modelTurn": {"parts": [{"text": "Point the camera left."}]}}})),
        Message::Binary(
            json!({"server_content": {"model_turn": {"parts": [{"inline_data": {"mime_type": "audio/pcm;rate=24000", "data": "AQID"}}]}}})
                .to_string()
                .into_bytes()
                .into(),
        ),
        Message::Text("not json".into()),
        text(json!({"serverContent": {"outputTranscription": {"text": "I see the door."}}})),
    ];
    let mut upstream = spawn_upstream(Plan::acking(script, After::Close)).await;
    let transport = transport(config(&upstream));

    transport.connect().await.unwrap();
    assert_eq!(transport.active_region().as_deref(), Some("us-central1"));

    let setup = upstream.next_frame().await;
    assert_eq!(
        setup["setup"]["model"],
        "projects/proj/locations/us-central1/publishers/google/models/gemini-live-2.5-flash-native-audio"
    );
    assert_eq!(setup["setup"]["system_instruction"]["parts"][0]["text"], "test instructions");
    assert_eq!(upstream.auth.lock().as_slice(), ["Bearer test-token"]);

    let events = collect(&transport).await;
    assert_eq!(
        events,
        vec![
            LiveEvent::text("Point the camera left."),
            LiveEvent::Audio {
                mime: "audio/pcm;rate=24000".into(),
                data: vec![1, 2, 3]
            },
            LiveEvent::text("I see the door."),
        ]
    );
    transport.close().await;
}

#[tokio::test]
async fn falls_back_to_next_region() {
    let mut upstream = spawn_upstream(Plan {
        reject_regions: vec!["us-central1"],
        ..Plan::acking(Vec::new(), After::Hold)
    })
    .await;
    let transport = transport(config(&upstream));

    transport.connect().await.unwrap();
    assert_eq!(transport.active_region().as_deref(), Some("europe-west4"));
    assert_eq!(
        upstream.paths.lock().as_slice(),
        ["/ws/us-central1", "/ws/europe-west4"]
    );
    let setup = upstream.next_frame().await;
    assert!(
        setup["setup"]["model"]
            .as_str()
            .unwrap()
            .contains("/locations/europe-west4/")
    );
    transport.close().await;
}

#[tokio::test]
async fn exhausted_regions_report_every_attempt() {
    let upstream = spawn_upstream(Plan {
        reject_regions: vec!["us-central1", "europe-west4"],
        ..Plan::acking(Vec::new(), After::Hold)
    })
    .await;
    let transport = transport(config(&upstream));

    let err = transport.connect().await.unwrap_err();
    assert_matches!(
        err,
        LiveError::Connect { ref regions, .. } if regions == &["us-central1", "europe-west4"]
    );
    assert_matches!(transport.send_audio(&[0]).await, Err(LiveError::NotConnected));
}

#[tokio::test]
async fn upstream_error_before_ack_fails_the_attempt() {
    let upstream = spawn_upstream(Plan {
        reject_regions: Vec::new(),
        ack: false,
        script: vec![text(json!({"error": {"code": 404, "message": "model not found"}}))],
        after: After::Hold,
    })
    .await;
    let transport = transport(config(&upstream));

    let err = transport.connect().await.unwrap_err();
    let LiveError::Connect { source, .. } = err else {
        panic!("expected connect error, got {err:?}");
    };
    assert_matches!(*source, LiveError::Handshake(ref msg) if msg == "404: model not found");
}

#[tokio::test]
async fn missing_project_fails_before_dialing() {
    let upstream = spawn_upstream(Plan::acking(Vec::new(), After::Hold)).await;
    let config = LiveConfig {
        project_id: None,
        ..config(&upstream)
    };
    let transport = transport(config);

    assert_matches!(transport.connect().await, Err(LiveError::MissingProject));
    assert!(upstream.paths.lock().is_empty());
}

#[tokio::test]
async fn credential_failure_short_circuits() {
    let upstream = spawn_upstream(Plan::acking(Vec::new(), After::Hold)).await;
    let transport = DirectTransport::new(config(&upstream), Arc::new(BrokenCredentials));

    assert_matches!(transport.connect().await, Err(LiveError::Credentials(_)));
    assert!(upstream.paths.lock().is_empty());
}

#[tokio::test]
async fn missing_ack_degrades_to_connected() {
    let mut upstream = spawn_upstream(Plan {
        reject_regions: Vec::new(),
        ack: false,
        script: Vec::new(),
        after: After::Hold,
    })
    .await;
    let config = LiveConfig {
        setup_timeout: Duration::from_millis(200),
        ..config(&upstream)
    };
    let transport = transport(config);

    let started = Instant::now();
    transport.connect().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(transport.active_region().as_deref(), Some("us-central1"));

    let _setup = upstream.next_frame().await;
    transport.send_text("Hello", "user").await.unwrap();
    let turn = upstream.next_frame().await;
    assert_eq!(turn["client_content"]["turns"][0]["parts"][0]["text"], "Hello");
    assert_eq!(turn["client_content"]["turn_complete"], true);
    transport.close().await;
}

#[tokio::test]
async fn image_frames_are_throttled() {
    let mut upstream = spawn_upstream(Plan::acking(Vec::new(), After::Hold)).await;
    let transport = transport(config(&upstream));
    transport.connect().await.unwrap();
    let _setup = upstream.next_frame().await;

    transport.send_image_jpeg(&[0xff, 0xd8, 0x01]).await.unwrap();
    transport.send_image_jpeg(&[0xff, 0xd8, 0x02]).await.unwrap();
    transport.send_audio(&[0, 0, 1, 0]).await.unwrap();

    let first = upstream.next_frame().await;
    let second = upstream.next_frame().await;
    assert_eq!(first["realtime_input"]["media_chunks"][0]["mime_type"], "image/jpeg");
    assert_eq!(first["realtime_input"]["media_chunks"][0]["data"], "/9gB");
    assert_eq!(
        second["realtime_input"]["media_chunks"][0]["mime_type"],
        "audio/pcm;rate=16000"
    );
    transport.close().await;
}

#[tokio::test]
async fn abrupt_disconnect_surfaces_one_error_then_ends() {
    let script = vec![text(json!({"serverContent": {"modelTurn": {"parts": [{"text": "Step one."}]}}}))];
    let upstream = spawn_upstream(Plan::acking(script, After::Drop)).await;
    let transport = transport(config(&upstream));
    transport.connect().await.unwrap();

    let events = collect(&transport).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], LiveEvent::text("Step one."));
    assert_matches!(&events[1], LiveEvent::Error { .. });

    assert_matches!(transport.send_audio(&[0]).await, Err(LiveError::NotConnected));
    assert_matches!(transport.events().map(|_| ()), Err(LiveError::StreamTaken));
    transport.close().await;
    transport.close().await;
    assert_matches!(transport.events().map(|_| ()), Err(LiveError::NotConnected));
}

#[tokio::test]
async fn go_away_ends_the_stream() {
    let script = vec![text(json!({"goAway": {"timeLeft": "1s"}}))];
    let upstream = spawn_upstream(Plan::acking(script, After::Hold)).await;
    let transport = transport(config(&upstream));
    transport.connect().await.unwrap();

    let events = collect(&transport).await;
    assert_eq!(events, vec![LiveEvent::error(RECONNECT_ADVISORY)]);
    transport.close().await;
}

#[tokio::test]
async fn close_terminates_an_open_stream() {
    let upstream = spawn_upstream(Plan::acking(Vec::new(), After::Hold)).await;
    let transport = transport(config(&upstream));
    transport.connect().await.unwrap();
    let stream = transport.events().unwrap();

    transport.close().await;
    let events = tokio::time::timeout(Duration::from_secs(5), stream.collect::<Vec<_>>())
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn operations_require_connection() {
    let upstream = spawn_upstream(Plan::acking(Vec::new(), After::Hold)).await;
    let transport = transport(config(&upstream));

    assert_matches!(transport.send_audio(&[1]).await, Err(LiveError::NotConnected));
    assert_matches!(transport.send_image_jpeg(&[1]).await, Err(LiveError::NotConnected));
    assert_matches!(transport.send_text("x", "user").await, Err(LiveError::NotConnected));
    assert_matches!(transport.events().map(|_| ()), Err(LiveError::NotConnected));
    assert_eq!(transport.active_region(), None);
    transport.close().await;
}
