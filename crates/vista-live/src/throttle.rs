//! Rate limit for outbound camera frames.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Admits at most one frame per `min_interval`; excess frames are dropped.
#[derive(Debug)]
pub struct FrameThrottle {
    min_interval: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl FrameThrottle {
    /// Throttle with the given minimum spacing.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: Mutex::new(None),
        }
    }

    /// Claim a send slot. Returns `false` if the frame should be dropped.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_sent.lock();
        match *last {
            Some(prev) if now.duration_since(prev) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Forget the last send (new connection).
    pub fn reset(&self) {
        *self.last_sent.lock() = None;
    }
}

impl Default for FrameThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
