//! Managed streaming-runtime adapter.
//!
//! The runtime is an externally supplied SDK, modelled here by the
//! [`ManagedRuntime`] and [`RuntimeSession`] traits. The adapter exposes the
//! same [`LiveTransport`] contract as the direct transport, translating the
//! runtime's typed events into [`LiveEvent`]s.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::FutureExt as _;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use vista_core::constants::{DEFAULT_OUTPUT_AUDIO_MIME, INPUT_AUDIO_MIME, INPUT_IMAGE_MIME};
use vista_core::{LiveEvent, RiskMode, StatusState};
use vista_settings::CompressionSettings;

use crate::config::LiveConfig;
use crate::error::{LiveError, Result};
use crate::queue::{EventReceiver, EventSender, EventStream, event_queue};
use crate::regions::{DEFAULT_REGION, candidate_regions};
use crate::throttle::FrameThrottle;
use crate::transport::LiveTransport;

/// Ambient environment the runtime needs before a session can be created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeEnvironment {
    /// Cloud project.
    pub project: String,
    /// Region.
    pub location: String,
}

/// Key under which the runtime creates or resumes a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
    /// Registered application name.
    pub app_name: String,
    /// Stable per-user key.
    pub user_key: String,
    /// Stable per-session key.
    pub session_key: String,
}

/// Model parameters for a runtime session.
#[derive(Clone, Debug)]
pub struct RuntimeSetup {
    /// Live model identifier.
    pub model_id: String,
    /// System-instruction text.
    pub system_instructions: String,
    /// Requested response modality.
    pub response_modality: String,
    /// Context-window compression.
    pub compression: CompressionSettings,
}

/// Typed media payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaBlob {
    /// MIME type.
    pub mime_type: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

/// One part of a content turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentPart {
    /// Plain text.
    Text(String),
    /// Inline media.
    Blob(MediaBlob),
}

/// A content turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Content {
    /// Author role.
    pub role: String,
    /// Ordered parts.
    pub parts: Vec<ContentPart>,
}

/// Event object produced by a runtime session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeEvent {
    /// Model output was interrupted by user speech.
    pub interrupted: bool,
    /// Error code, if the event reports a failure.
    pub error_code: Option<String>,
    /// Error message, if the event reports a failure.
    pub error_message: Option<String>,
    /// Transcribed user speech.
    pub input_transcription: Option<String>,
    /// Transcribed model speech.
    pub output_transcription: Option<String>,
    /// Model content.
    pub content: Option<Content>,
}

/// Factory side of a managed streaming SDK.
#[async_trait]
pub trait ManagedRuntime: Send + Sync {
    /// Apply project/region settings before creating sessions.
    fn configure_environment(&self, env: &RuntimeEnvironment) -> Result<()>;

    /// Create a session, or resume the one stored under `key`.
    async fn create_or_resume_session(
        &self,
        key: &SessionKey,
        setup: &RuntimeSetup,
    ) -> Result<Arc<dyn RuntimeSession>>;
}

/// One live session inside the managed runtime.
#[async_trait]
pub trait RuntimeSession: Send + Sync {
    /// Send realtime media.
    async fn send_realtime(&self, blob: MediaBlob) -> Result<()>;

    /// Send a content turn.
    async fn send_content(&self, content: Content) -> Result<()>;

    /// Next event; `None` once the session is over.
    async fn next_event(&self) -> Option<Result<RuntimeEvent>>;

    /// Close the session.
    async fn close(&self);
}

/// Map one runtime event onto live events, same priority as the direct path.
pub fn translate_runtime_event(event: RuntimeEvent, skill: &str) -> Vec<LiveEvent> {
    let error = match (event.error_code, event.error_message) {
        (Some(code), Some(message)) => Some(format!("{code}: {message}")),
        (Some(text), None) | (None, Some(text)) => Some(text),
        (None, None) => None,
    };
    if let Some(message) = error {
        return vec![LiveEvent::error(message)];
    }

    let mut events = Vec::new();
    if event.interrupted {
        events.push(LiveEvent::status(StatusState::Connected, RiskMode::Normal, skill));
    }
    for text in [event.input_transcription, event.output_transcription]
        .into_iter()
        .flatten()
    {
        if !text.trim().is_empty() {
            events.push(LiveEvent::text(text));
        }
    }
    for part in event.content.map(|c| c.parts).unwrap_or_default() {
        match part {
            ContentPart::Text(text) if !text.is_empty() => events.push(LiveEvent::text(text)),
            ContentPart::Blob(blob) if !blob.data.is_empty() => {
                let mime = if blob.mime_type.is_empty() {
                    DEFAULT_OUTPUT_AUDIO_MIME.to_string()
                } else {
                    blob.mime_type
                };
                events.push(LiveEvent::Audio {
                    mime,
                    data: blob.data,
                });
            }
            _ => {}
        }
    }
    events
}

struct ManagedConnection {
    region: String,
    session: Arc<dyn RuntimeSession>,
    events: EventSender,
    receiver: Mutex<Option<EventReceiver>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ManagedConnection {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn session(&self) -> Result<&Arc<dyn RuntimeSession>> {
        if self.is_closed() {
            Err(LiveError::NotConnected)
        } else {
            Ok(&self.session)
        }
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let reader = self.reader.lock().take();
        if let Some(handle) = reader {
            handle.abort();
            if let Some(e) = handle.await.err().filter(tokio::task::JoinError::is_panic) {
                warn!(error = %e, "runtime reader task panicked");
            }
        }
        self.session.close().await;
        let _ = self.events.finish();
    }

    fn abort(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(handle) = self.reader.lock().take() {
            handle.abort();
        }
        let _ = self.events.finish();
    }
}

async fn read_runtime(conn: Arc<ManagedConnection>, skill: String) {
    let pump = async {
        while let Some(next) = conn.session.next_event().await {
            for event in translate_runtime_event(next?, &skill) {
                let _ = conn.events.push(event);
            }
        }
        Ok::<(), LiveError>(())
    };
    match AssertUnwindSafe(pump).catch_unwind().await {
        Ok(Ok(())) => debug!("runtime session ended"),
        Ok(Err(e)) => {
            metrics::counter!("live_reader_errors_total", "transport" => "managed").increment(1);
            warn!(error = %e, "runtime reader failed");
            let _ = conn.events.push(LiveEvent::error(format!("Live session error: {e}")));
        }
        Err(_) => {
            metrics::counter!("live_reader_errors_total", "transport" => "managed").increment(1);
            error!("runtime reader panicked");
            let _ = conn.events.push(LiveEvent::error("Live session reader crashed"));
        }
    }
    conn.closed.store(true, Ordering::Release);
    conn.session.close().await;
    let _ = conn.events.finish();
}

/// [`LiveTransport`] backed by a [`ManagedRuntime`].
pub struct ManagedTransport {
    config: LiveConfig,
    runtime: Option<Arc<dyn ManagedRuntime>>,
    throttle: FrameThrottle,
    connection: Mutex<Option<Arc<ManagedConnection>>>,
}

impl ManagedTransport {
    /// Adapter over `runtime`; `None` makes every connect fail fast.
    pub fn new(config: LiveConfig, runtime: Option<Arc<dyn ManagedRuntime>>) -> Self {
        let throttle = FrameThrottle::new(config.video_min_interval);
        Self {
            config,
            runtime,
            throttle,
            connection: Mutex::new(None),
        }
    }

    fn live(&self) -> Result<Arc<ManagedConnection>> {
        self.connection
            .lock()
            .clone()
            .ok_or(LiveError::NotConnected)
    }

    fn setup(&self) -> RuntimeSetup {
        RuntimeSetup {
            model_id: self.config.model_id.clone(),
            system_instructions: self.config.system_instructions.clone(),
            response_modality: self.config.response_modality.clone(),
            compression: self.config.compression,
        }
    }

    fn session_key(&self) -> SessionKey {
        SessionKey {
            app_name: self.config.app_name.clone(),
            user_key: self.config.user_key.clone(),
            session_key: self.config.session_key.clone(),
        }
    }
}

#[async_trait]
impl LiveTransport for ManagedTransport {
    #[instrument(skip_all, fields(skill = %self.config.skill))]
    async fn connect(&self) -> Result<()> {
        self.close().await;
        let runtime = self.runtime.as_ref().ok_or_else(|| {
            LiveError::RuntimeUnavailable("no managed runtime registered".into())
        })?;
        let project = self
            .config
            .project()
            .ok_or(LiveError::MissingProject)?
            .to_string();
        let region = candidate_regions(
            &self.config.location,
            self.config.fallback_location.as_deref(),
        )
        .into_iter()
        .next()
        .unwrap_or_else(|| DEFAULT_REGION.to_string());

        runtime.configure_environment(&RuntimeEnvironment {
            project,
            location: region.clone(),
        })?;
        let session = runtime
            .create_or_resume_session(&self.session_key(), &self.setup())
            .await?;

        let (events, receiver) = event_queue();
        let conn = Arc::new(ManagedConnection {
            region: region.clone(),
            session,
            events,
            receiver: Mutex::new(Some(receiver)),
            reader: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        let handle = tokio::spawn(read_runtime(Arc::clone(&conn), self.config.skill.clone()));
        *conn.reader.lock() = Some(handle);
        self.throttle.reset();
        *self.connection.lock() = Some(conn);

        metrics::counter!("live_connect_total", "transport" => "managed", "status" => "ok")
            .increment(1);
        info!(region = %region, "managed live session connected");
        Ok(())
    }

    async fn close(&self) {
        let conn = self.connection.lock().take();
        if let Some(conn) = conn {
            conn.shutdown().await;
            info!(region = %conn.region, "managed live session closed");
        }
    }

    async fn send_audio(&self, pcm: &[u8]) -> Result<()> {
        let conn = self.live()?;
        conn.session()?
            .send_realtime(MediaBlob {
                mime_type: INPUT_AUDIO_MIME.to_string(),
                data: pcm.to_vec(),
            })
            .await
    }

    async fn send_image_jpeg(&self, jpeg: &[u8]) -> Result<()> {
        let conn = self.live()?;
        let session = conn.session()?;
        if !self.throttle.try_acquire() {
            metrics::counter!("live_frames_dropped_total", "transport" => "managed").increment(1);
            return Ok(());
        }
        session
            .send_realtime(MediaBlob {
                mime_type: INPUT_IMAGE_MIME.to_string(),
                data: jpeg.to_vec(),
            })
            .await
    }

    async fn send_text(&self, text: &str, role: &str) -> Result<()> {
        let conn = self.live()?;
        conn.session()?
            .send_content(Content {
                role: role.to_string(),
                parts: vec![ContentPart::Text(text.to_string())],
            })
            .await
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
        "managed"
    }
}

impl Drop for ManagedTransport {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.get_mut().take() {
            conn.abort();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
