//! `VistaServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{Json, Response};
use axum::routing::get;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use vista_session::TriggerPolicy;

use crate::config::ServerConfig;
use crate::directory::{PassthroughDirectory, SessionDirectory};
use crate::errors::ServerError;
use crate::factory::BridgeFactory;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::protocol::LiveQuery;
use crate::websocket::session::run_live_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session lookup and completion sink.
    pub directory: Arc<dyn SessionDirectory>,
    /// Upstream bridge factory.
    pub factory: Arc<dyn BridgeFactory>,
    /// Trigger vocabulary for every session's state machine.
    pub policy: Arc<TriggerPolicy>,
    /// Shutdown signal and open-session count.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Max inbound WebSocket message size.
    pub max_message_size: usize,
}

/// The Vista live-session server.
pub struct VistaServer {
    config: ServerConfig,
    directory: Arc<dyn SessionDirectory>,
    factory: Arc<dyn BridgeFactory>,
    policy: Arc<TriggerPolicy>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl VistaServer {
    /// Server with the passthrough directory and default trigger policy.
    pub fn new(config: ServerConfig, factory: Arc<dyn BridgeFactory>) -> Self {
        Self {
            config,
            directory: Arc::new(PassthroughDirectory),
            factory,
            policy: TriggerPolicy::shared_default(),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Replace the session directory.
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn SessionDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Replace the trigger policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<TriggerPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            directory: Arc::clone(&self.directory),
            factory: Arc::clone(&self.factory),
            policy: Arc::clone(&self.policy),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            max_message_size: self.config.max_message_size,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/ws/live", get(live_ws_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve in the background until [`ShutdownCoordinator::shutdown`].
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "vista server listening");

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                warn!(error = %e, "server exited with error");
            }
        });
        Ok((local_addr, handle))
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open live-session count.
    pub fn connection_count(&self) -> usize {
        self.shutdown.active_sessions()
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        &state.shutdown,
        state.factory.managed_runtime_available(),
    ))
}

/// GET /ws/live
async fn live_ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<LiveQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| run_live_session(socket, query, state))
}
