//! Multi-producer, single-consumer event queue with a one-shot terminator.
//!
//! Producers push [`LiveEvent`]s; [`EventSender::finish`] enqueues the
//! terminator exactly once no matter how many shutdown paths race to call
//! it. The consumer side is a finite stream that ends at the terminator.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::Stream;
use tokio::sync::mpsc;
use tracing::trace;
use vista_core::LiveEvent;

/// Finite stream of normalized events.
pub type EventStream = Pin<Box<dyn Stream<Item = LiveEvent> + Send>>;

#[derive(Debug)]
enum Item {
    Event(LiveEvent),
    End,
}

/// Producer handle. Cheap to clone.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Item>,
    finished: Arc<AtomicBool>,
}

/// Consumer handle.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Item>,
}

/// Create a connected sender/receiver pair.
pub fn event_queue() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventSender {
            tx,
            finished: Arc::new(AtomicBool::new(false)),
        },
        EventReceiver { rx },
    )
}

impl EventSender {
    /// Enqueue an event. Returns `false` if the queue already finished.
    pub fn push(&self, event: LiveEvent) -> bool {
        if self.finished.load(Ordering::Acquire) {
            trace!(event = event.event_type(), "dropping event after terminator");
            return false;
        }
        self.tx.send(Item::Event(event)).is_ok()
    }

    /// Enqueue the terminator. Only the first call has any effect.
    ///
    /// Returns `true` for the call that actually enqueued it.
    pub fn finish(&self) -> bool {
        if self
            .finished
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let _ = self.tx.send(Item::End);
        true
    }

    /// Whether the terminator has been enqueued.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl EventReceiver {
    /// Next event, or `None` once the terminator (or a dropped producer side) is reached.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        match self.rx.recv().await? {
            Item::Event(event) => Some(event),
            Item::End => {
                self.rx.close();
                None
            }
        }
    }

    /// Consume into a stream that ends at the terminator.
    pub fn into_stream(mut self) -> EventStream {
        Box::pin(async_stream::stream! {
            while let Some(event) = self.recv().await {
                yield event;
            }
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn events_arrive_in_order_then_end() {
        let (tx, rx) = event_queue();
        assert!(tx.push(LiveEvent::text("a")));
        assert!(tx.push(LiveEvent::text("b")));
        assert!(tx.finish());

        let events: Vec<_> = rx.into_stream().collect().await;
        assert_eq!(events, vec![LiveEvent::text("a"), LiveEvent::text("b")]);
    }

    #[tokio::test]
    async fn finish_is_idempotent() {
        let (tx, mut rx) = event_queue();
        let other = tx.clone();
        assert!(tx.finish());
        assert!(!other.finish());
        assert!(!tx.finish());
        drop(tx);
        drop(other);

        let mut ends = 0;
        while let Some(item) = rx.rx.recv().await {
            if matches!(item, Item::End) {
                ends += 1;
            }
        }
        assert_eq!(ends, 1);
    }

    #[tokio::test]
    async fn error_then_close_yields_single_terminator() {
        // Reader failure path followed by an explicit close
        let (tx, rx) = event_queue();
        let reader = tx.clone();
        assert!(reader.push(LiveEvent::error("socket reset")));
        assert!(reader.finish());
        assert!(!tx.finish());

        let events: Vec<_> = rx.into_stream().collect().await;
        assert_eq!(events, vec![LiveEvent::error("socket reset")]);
    }

    #[tokio::test]
    async fn push_after_finish_is_dropped() {
        let (tx, rx) = event_queue();
        assert!(tx.finish());
        assert!(!tx.push(LiveEvent::text("late")));
        assert!(tx.is_finished());

        let events: Vec<_> = rx.into_stream().collect().await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn dropped_senders_end_stream() {
        let (tx, rx) = event_queue();
        assert!(tx.push(LiveEvent::text("only")));
        drop(tx);
        let events: Vec<_> = rx.into_stream().collect().await;
        assert_eq!(events.len(), 1);
    }
}
