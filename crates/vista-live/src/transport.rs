//! The contract every upstream transport implements.

use async_trait::async_trait;

use crate::error::Result;
use crate::queue::EventStream;

/// One upstream live-model session.
///
/// Writes are serialized internally, so outbound sends may run concurrently
/// with a consumer draining [`events`](LiveTransport::events).
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Open the upstream session.
    async fn connect(&self) -> Result<()>;

    /// Release the session. Idempotent.
    async fn close(&self);

    /// Send raw 16-bit little-endian PCM at 16 kHz.
    async fn send_audio(&self, pcm: &[u8]) -> Result<()>;

    /// Send one JPEG frame. Frames beyond the rate limit are dropped.
    async fn send_image_jpeg(&self, jpeg: &[u8]) -> Result<()>;

    /// Send a complete text turn with the given role.
    async fn send_text(&self, text: &str, role: &str) -> Result<()>;

    /// Take the event stream for the current connection. Can be called once
    /// per connection; the stream ends after the terminator.
    fn events(&self) -> Result<EventStream>;

    /// Region serving the current connection.
    fn active_region(&self) -> Option<String>;

    /// Short label for logs and metrics.
    fn name(&self) -> &'static str;
}
