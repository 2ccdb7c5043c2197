//! Broadcast bus for group lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]:
//!
//! - **Non-blocking publish**: `publish()` never blocks or awaits.
//! - **Bounded capacity**: one ring buffer shared by all receivers; slow
//!   receivers observe `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events published with no active receivers are
//!   dropped silently.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for group lifecycle events.
///
/// Cheap to clone (internally an `Arc`-backed sender); many publishers, any
/// number of independent receivers.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers; returns immediately.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver observing events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    /// A bus with room for 64 recent events.
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(Event::new(EventKind::TaskSpawned).with_slot(0));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::TaskSpawned);
        assert_eq!(ev.slot, Some(0));
    }

    #[test]
    fn test_publish_without_receivers_is_a_noop() {
        let bus = Bus::new(1);
        bus.publish(Event::new(EventKind::GenerationClosed));
    }
}
