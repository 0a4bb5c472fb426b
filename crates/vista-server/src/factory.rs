//! Builds one live bridge per client connection.

use std::sync::Arc;

use vista_auth::CredentialProvider;
use vista_live::{LiveBridge, LiveConfig, LiveTransport, ManagedRuntime};

/// Per-connection parameters for a new bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeRequest {
    /// Resolved skill code.
    pub skill: String,
    /// Stable per-user key.
    pub user_key: String,
    /// Stable per-session key.
    pub session_key: String,
}

/// Creates upstream transports for the WebSocket handler.
pub trait BridgeFactory: Send + Sync {
    /// A fresh, unconnected transport.
    fn create(&self, request: &BridgeRequest) -> Arc<dyn LiveTransport>;

    /// Whether a managed runtime is registered.
    fn managed_runtime_available(&self) -> bool;
}

/// Production factory producing [`LiveBridge`]s.
///
/// The credential provider is shared across connections so a cached token
/// is reused until it nears expiry.
pub struct LiveBridgeFactory {
    base: LiveConfig,
    credentials: Arc<dyn CredentialProvider>,
    runtime: Option<Arc<dyn ManagedRuntime>>,
}

impl LiveBridgeFactory {
    /// Factory over a base configuration and shared credentials.
    pub fn new(base: LiveConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            base,
            credentials,
            runtime: None,
        }
    }

    /// Register a managed streaming runtime.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Arc<dyn ManagedRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }
}

impl BridgeFactory for LiveBridgeFactory {
    fn create(&self, request: &BridgeRequest) -> Arc<dyn LiveTransport> {
        let config = self.base.clone().for_session(
            request.skill.clone(),
            request.user_key.clone(),
            request.session_key.clone(),
        );
        Arc::new(LiveBridge::new(
            config,
            Arc::clone(&self.credentials),
            self.runtime.clone(),
        ))
    }

    fn managed_runtime_available(&self) -> bool {
        self.runtime.is_some()
    }
}
