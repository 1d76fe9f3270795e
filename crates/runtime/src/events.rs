//! Event Bus - session events fanned out to producers
//!
//! Design: one broadcast channel per session. Listeners fire synchronously
//! inside host dispatch; the bus only publishes, it never waits.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use interpreter::{ApplyStats, EventRecord, EventResponse, EventSink};

/// Events a session reports to whoever produces its edit streams
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    Started { session_id: String },
    EditsApplied { stats: ApplyStats },
    ApplyFailed { error: String },
    /// A registered listener fired
    UserEvent(EventRecord),
    Resynchronized,
    Stopped,
}

/// Simple event bus using tokio broadcast channel
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    /// Event types whose native default action is always suppressed
    prevent_default: Arc<[String]>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            prevent_default: Arc::from(Vec::<String>::new()),
        }
    }

    pub fn with_prevent_default(mut self, event_types: &[String]) -> Self {
        self.prevent_default = event_types.into();
        self
    }

    /// Publish an event
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.tx.send(event); // Ignore error if no subscribers
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn handle_event(&self, record: EventRecord) -> EventResponse {
        let response = if self.prevent_default.iter().any(|t| *t == record.event_type) {
            EventResponse::PreventDefault
        } else {
            EventResponse::Continue
        };
        self.publish(SessionEvent::UserEvent(record));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpreter::EventData;

    fn record(event_type: &str) -> EventRecord {
        EventRecord {
            event_type: event_type.to_string(),
            target: 3,
            handler: 1,
            bubbles: true,
            data: EventData::Generic,
        }
    }

    #[tokio::test]
    async fn test_event_bus() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(SessionEvent::Stopped);

        match rx.recv().await {
            Ok(SessionEvent::Stopped) => {}
            _ => panic!("Expected Stopped event"),
        }
    }

    #[tokio::test]
    async fn test_sink_publishes_user_events() {
        let bus = EventBus::new().with_prevent_default(&["submit".to_string()]);
        let mut rx = bus.subscribe();

        assert_eq!(bus.handle_event(record("click")), EventResponse::Continue);
        assert_eq!(
            bus.handle_event(record("submit")),
            EventResponse::PreventDefault
        );

        match rx.recv().await {
            Ok(SessionEvent::UserEvent(r)) => assert_eq!(r.event_type, "click"),
            other => panic!("Expected user event, got {:?}", other),
        }
        match rx.recv().await {
            Ok(SessionEvent::UserEvent(r)) => assert_eq!(r.target, 3),
            other => panic!("Expected user event, got {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::with_capacity(0);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(SessionEvent::Resynchronized);
    }
}
