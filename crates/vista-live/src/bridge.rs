//! Bridge façade selecting between the managed and direct transports.
//!
//! Selection happens once per [`connect`](LiveTransport::connect): when the
//! managed runtime is preferred it is tried first, and any failure falls
//! back to the direct transport. Every later call dispatches to whichever
//! transport won.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};
use vista_auth::CredentialProvider;

use crate::config::LiveConfig;
use crate::direct::DirectTransport;
use crate::error::{LiveError, Result};
use crate::managed::{ManagedRuntime, ManagedTransport};
use crate::queue::EventStream;
use crate::transport::LiveTransport;

/// Live session façade.
pub struct LiveBridge {
    managed: Option<Arc<dyn LiveTransport>>,
    direct: Arc<dyn LiveTransport>,
    prefer_managed: bool,
    active: Mutex<Option<Arc<dyn LiveTransport>>>,
}

impl LiveBridge {
    /// Standard bridge: managed adapter over `runtime`, direct transport over `credentials`.
    pub fn new(
        config: LiveConfig,
        credentials: Arc<dyn CredentialProvider>,
        runtime: Option<Arc<dyn ManagedRuntime>>,
    ) -> Self {
        let prefer_managed = config.use_managed_runtime;
        let managed: Arc<dyn LiveTransport> =
            Arc::new(ManagedTransport::new(config.clone(), runtime));
        let direct: Arc<dyn LiveTransport> = Arc::new(DirectTransport::new(config, credentials));
        Self::from_transports(Some(managed), direct, prefer_managed)
    }

    /// Bridge over arbitrary transports.
    pub fn from_transports(
        managed: Option<Arc<dyn LiveTransport>>,
        direct: Arc<dyn LiveTransport>,
        prefer_managed: bool,
    ) -> Self {
        Self {
            managed,
            direct,
            prefer_managed,
            active: Mutex::new(None),
        }
    }

    fn active(&self) -> Result<Arc<dyn LiveTransport>> {
        self.active.lock().clone().ok_or(LiveError::NotConnected)
    }

    /// Name of the transport serving the current connection.
    pub fn active_transport(&self) -> Option<&'static str> {
        self.active.lock().as_ref().map(|t| t.name())
    }
}

#[async_trait]
impl LiveTransport for LiveBridge {
    async fn connect(&self) -> Result<()> {
        self.close().await;

        if self.prefer_managed {
            match &self.managed {
                Some(managed) => match managed.connect().await {
                    Ok(()) => {
                        info!(transport = managed.name(), "live bridge connected");
                        *self.active.lock() = Some(Arc::clone(managed));
                        return Ok(());
                    }
                    Err(e) => {
                        metrics::counter!("live_connect_total", "transport" => "managed", "status" => "fallback")
                            .increment(1);
                        warn!(error = %e, "managed runtime failed; falling back to direct transport");
                    }
                },
                None => warn!("managed runtime preferred but none configured; using direct transport"),
            }
        }

        self.direct.connect().await?;
        info!(transport = self.direct.name(), "live bridge connected");
        *self.active.lock() = Some(Arc::clone(&self.direct));
        Ok(())
    }

    async fn close(&self) {
        let active = self.active.lock().take();
        if let Some(transport) = active {
            transport.close().await;
        }
    }

    async fn send_audio(&self, pcm: &[u8]) -> Result<()> {
        self.active()?.send_audio(pcm).await
    }

    async fn send_image_jpeg(&self, jpeg: &[u8]) -> Result<()> {
        self.active()?.send_image_jpeg(jpeg).await
    }

    async fn send_text(&self, text: &str, role: &str) -> Result<()> {
        self.active()?.send_text(text, role).await
    }

    fn events(&self) -> Result<EventStream> {
        self.active()?.events()
    }

    fn active_region(&self) -> Option<String> {
        self.active.lock().as_ref().and_then(|t| t.active_region())
    }

    fn name(&self) -> &'static str {
        "bridge"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
