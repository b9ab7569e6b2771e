//! Broadcast bus for object change events.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::ObjectEvent;
use crate::object::Object;

/// Default buffer size for the broadcast channel.
/// Slow receivers past this limit observe `RecvError::Lagged`.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Cloneable multi-subscriber event bus.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<ObjectEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Send an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it, 0 when nobody
    /// is listening.
    pub fn send(&self, event: ObjectEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => count,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(kind = %event.kind, key = %event.key, "no event subscribers");
                0
            }
        }
    }

    pub fn send_created(&self, object: &Object) -> usize {
        self.send(ObjectEvent::created(object))
    }

    pub fn send_updated(&self, object: &Object) -> usize {
        self.send(ObjectEvent::updated(object))
    }

    pub fn send_deleted(&self, object: &Object) -> usize {
        self.send(ObjectEvent::deleted(object))
    }

    /// Subscribe to events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ObjectEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ObjectEventType;
    use crate::object::{Kind, ObjectKey};

    fn secret() -> Object {
        Object::new(Kind::Secret, &ObjectKey::new("default", "blog-wp"))
    }

    #[test]
    fn test_broadcaster_no_subscribers() {
        let broadcaster = EventBroadcaster::new();
        assert!(!broadcaster.has_subscribers());
        assert_eq!(broadcaster.send_created(&secret()), 0);
    }

    #[tokio::test]
    async fn test_broadcaster_send_receive() {
        let broadcaster = EventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();

        assert_eq!(broadcaster.send_deleted(&secret()), 1);

        let event = tokio_test::assert_ok!(receiver.recv().await);
        assert_eq!(event.event_type, ObjectEventType::Deleted);
        assert_eq!(event.key, ObjectKey::new("default", "blog-wp"));
    }

    #[tokio::test]
    async fn test_broadcaster_lagged_receiver() {
        let broadcaster = EventBroadcaster::with_capacity(2);
        let mut receiver = broadcaster.subscribe();

        for _ in 0..4 {
            broadcaster.send_updated(&secret());
        }

        assert!(matches!(
            receiver.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
    }
}
