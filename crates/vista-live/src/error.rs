//! Live transport error types.

use tokio_tungstenite::tungstenite;
use vista_auth::AuthError;

/// Errors surfaced by live transports and the bridge.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    /// Operation attempted before `connect()` or after `close()`.
    #[error("live session is not connected")]
    NotConnected,

    /// `events()` was already called for this connection.
    #[error("event stream already taken")]
    StreamTaken,

    /// No cloud project configured.
    #[error("no project id configured (set VISTA_PROJECT_ID or GOOGLE_CLOUD_PROJECT)")]
    MissingProject,

    /// Obtaining a bearer token failed.
    #[error("credential failure: {0}")]
    Credentials(#[source] AuthError),

    /// Every candidate region failed.
    #[error("could not connect in any region ({}): {source}", regions.join(", "))]
    Connect {
        /// Regions attempted, in order.
        regions: Vec<String>,
        /// Failure of the last attempt.
        #[source]
        source: Box<LiveError>,
    },

    /// WebSocket transport failure.
    #[error("websocket error: {0}")]
    Socket(#[source] Box<tungstenite::Error>),

    /// The upstream handshake did not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No managed streaming runtime is registered.
    #[error("managed runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// The managed runtime reported a failure.
    #[error("managed runtime error: {0}")]
    Runtime(String),
}

impl From<tungstenite::Error> for LiveError {
    fn from(err: tungstenite::Error) -> Self {
        Self::Socket(Box::new(err))
    }
}

/// Result type for live operations.
pub type Result<T> = std::result::Result<T, LiveError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn connect_error_lists_regions_and_cause() {
        let err = LiveError::Connect {
            regions: vec!["us-central1".into(), "europe-west4".into()],
            source: Box::new(LiveError::Handshake("closed before setup".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("us-central1, europe-west4"));
        assert!(msg.contains("closed before setup"));
        assert!(err.source().is_some());
    }

    #[test]
    fn socket_error_from_tungstenite() {
        let err: LiveError = tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, LiveError::Socket(_)));
    }

    #[test]
    fn credentials_error_keeps_source() {
        let err = LiveError::Credentials(AuthError::NotConfigured("none".into()));
        assert!(err.source().is_some());
    }
}
