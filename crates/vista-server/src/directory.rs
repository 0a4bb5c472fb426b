//! Resolution of a client's `(token, session_id)` into session keys.
//!
//! Token verification and session persistence live outside this crate; a
//! deployment plugs them in through [`SessionDirectory`].

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;
use vista_session::SessionSummary;

/// What the client asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRequest {
    /// Opaque client token.
    pub token: String,
    /// Session identifier.
    pub session_id: Uuid,
    /// Goal supplied on the query string.
    pub goal: Option<String>,
}

/// Keys and metadata for an authorized session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSession {
    /// Stable per-user key.
    pub user_key: String,
    /// Stable per-session key.
    pub session_key: String,
    /// Goal text for the state machine.
    pub goal: Option<String>,
}

/// Directory lookup failures, shown to the client verbatim.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Token rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// No such session for this user.
    #[error("session {0} not found")]
    NotFound(Uuid),
}

/// Looks up sessions and records their outcome.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    /// Verify the request and return the session's keys.
    async fn resolve(&self, request: &SessionRequest) -> Result<ResolvedSession, DirectoryError>;

    /// Called once with the closing summary.
    async fn record_completion(&self, _session: &ResolvedSession, _summary: &SessionSummary) {}
}

/// Trusts the query string: the session id doubles as the session key.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughDirectory;

/// User key assigned by [`PassthroughDirectory`].
pub const PASSTHROUGH_USER_KEY: &str = "local-user";

#[async_trait]
impl SessionDirectory for PassthroughDirectory {
    async fn resolve(&self, request: &SessionRequest) -> Result<ResolvedSession, DirectoryError> {
        Ok(ResolvedSession {
            user_key: PASSTHROUGH_USER_KEY.to_string(),
            session_key: request.session_id.to_string(),
            goal: request.goal.clone(),
        })
    }

    async fn record_completion(&self, session: &ResolvedSession, summary: &SessionSummary) {
        info!(
            session_key = %session.session_key,
            scenario = %summary.scenario,
            bullets = summary.bullets.len(),
            "live session completed"
        );
    }
}
