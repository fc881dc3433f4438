//! Broadcast channel for session events.
//!
//! The connection session publishes a [`SessionEvent`] on every connect,
//! loss, and completed initial sync. Hosts subscribe to learn when their
//! cached view of the backend is stale.

use tokio::sync::broadcast;
use tracing::{trace, warn};

use super::SessionEvent;

/// Broadcast bus for [`SessionEvent`]s.
///
/// Lagging subscribers lose the oldest events; [`next_event`] skips over
/// the gap instead of failing.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a bus retaining up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event and returns how many subscribers got it.
    pub fn publish(&self, event: SessionEvent) -> usize {
        let kind = event.event_type_str();
        let receivers = self.sender.send(event).unwrap_or(0);
        trace!(event = kind, receivers, "session event published");
        receivers
    }

    /// Creates a receiver for all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Receives the next event, skipping any that were dropped while the
/// subscriber lagged. Returns `None` once the bus is gone.
pub async fn next_event(rx: &mut broadcast::Receiver<SessionEvent>) -> Option<SessionEvent> {
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "session event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sync_completed(session_id: Uuid) -> SessionEvent {
        SessionEvent::InitialSyncCompleted {
            session_id,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(sync_completed(Uuid::new_v4())), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let id = Uuid::new_v4();
        assert_eq!(bus.publish(sync_completed(id)), 1);

        let Some(event) = next_event(&mut rx).await else {
            panic!("expected to receive event");
        };
        assert_eq!(event.session_id(), Some(id));
    }

    #[tokio::test]
    async fn lagging_subscriber_resumes_at_oldest_retained_event() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            let _ = bus.publish(sync_completed(*id));
        }

        let Some(event) = next_event(&mut rx).await else {
            panic!("expected a retained event");
        };
        assert_eq!(event.session_id(), ids.get(2).copied());
    }

    #[tokio::test]
    async fn closed_bus_ends_the_stream() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        drop(bus);
        assert!(next_event(&mut rx).await.is_none());
    }
}
