//! `GET /health` body.

use std::time::Instant;

use serde::Serialize;

use crate::shutdown::ShutdownCoordinator;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"`, or `"draining"` once shutdown has begun.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Open live sessions.
    pub connections: usize,
    /// Whether a managed streaming runtime is registered.
    pub managed_runtime_available: bool,
}

/// Snapshot the server's liveness counters.
pub fn health_check(
    start_time: Instant,
    shutdown: &ShutdownCoordinator,
    managed_runtime_available: bool,
) -> HealthResponse {
    HealthResponse {
        status: if shutdown.is_shutting_down() { "draining" } else { "ok" },
        uptime_secs: start_time.elapsed().as_secs(),
        connections: shutdown.active_sessions(),
        managed_runtime_available,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn fresh_server_is_ok() {
        let resp = health_check(Instant::now(), &ShutdownCoordinator::new(), false);
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.connections, 0);
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn reports_open_sessions_and_draining() {
        let coord = ShutdownCoordinator::new();
        let _guard = coord.session_guard();
        coord.shutdown();

        let start = Instant::now().checked_sub(Duration::from_secs(60)).unwrap();
        let value = serde_json::to_value(health_check(start, &coord, true)).unwrap();
        assert_eq!(value["status"], "draining");
        assert_eq!(value["connections"], 1);
        assert_eq!(value["managed_runtime_available"], true);
        assert!(value["uptime_secs"].as_u64().unwrap() >= 59);
    }
}
