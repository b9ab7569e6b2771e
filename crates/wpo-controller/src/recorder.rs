//! Observability events emitted by reconciliation passes.

use std::fmt;
use std::sync::Mutex;

use wpo_core::{Kind, ObjectRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSeverity {
    Normal,
    Warning,
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::Warning => write!(f, "Warning"),
        }
    }
}

/// One event about a child object, attached to its owning resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub severity: EventSeverity,
    /// CamelCase reason, e.g. `DeploymentCreated`.
    pub reason: String,
    pub kind: Kind,
    pub name: String,
    pub message: String,
}

impl RecordedEvent {
    pub fn normal(reason: impl Into<String>, child: &ObjectRef, message: impl Into<String>) -> Self {
        Self::new(EventSeverity::Normal, reason, child, message)
    }

    pub fn warning(reason: impl Into<String>, child: &ObjectRef, message: impl Into<String>) -> Self {
        Self::new(EventSeverity::Warning, reason, child, message)
    }

    fn new(
        severity: EventSeverity,
        reason: impl Into<String>,
        child: &ObjectRef,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            reason: reason.into(),
            kind: child.kind,
            name: child.name.clone(),
            message: message.into(),
        }
    }
}

/// Sink for controller events.
pub trait EventRecorder: Send + Sync {
    fn record(&self, owner: &ObjectRef, event: RecordedEvent);
}

/// Writes events to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl EventRecorder for TracingRecorder {
    fn record(&self, owner: &ObjectRef, event: RecordedEvent) {
        match event.severity {
            EventSeverity::Normal => tracing::info!(
                owner = %owner,
                reason = %event.reason,
                kind = %event.kind,
                name = %event.name,
                "{}",
                event.message
            ),
            EventSeverity::Warning => tracing::warn!(
                owner = %owner,
                reason = %event.reason,
                kind = %event.kind,
                name = %event.name,
                "{}",
                event.message
            ),
        }
    }
}

/// Keeps events in memory, for tests and inspection.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<(ObjectRef, RecordedEvent)>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.lock().iter().map(|(_, e)| e.reason.clone()).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ObjectRef, RecordedEvent)>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, owner: &ObjectRef, event: RecordedEvent) {
        self.lock().push((owner.clone(), event));
    }
}

#[cfg(test)]
mod tests {
    use wpo_core::ObjectKey;

    use super::*;

    #[test]
    fn test_memory_recorder_keeps_order() {
        let recorder = MemoryRecorder::new();
        let owner = ObjectRef::new(Kind::Wordpress, &ObjectKey::new("default", "blog"));
        let child = ObjectRef::new(Kind::Secret, &ObjectKey::new("default", "blog-wp"));

        recorder.record(&owner, RecordedEvent::normal("SecretCreated", &child, "created"));
        recorder.record(&owner, RecordedEvent::warning("DeploymentSyncFailed", &child, "boom"));

        assert_eq!(recorder.reasons(), vec!["SecretCreated", "DeploymentSyncFailed"]);
        assert_eq!(recorder.events()[1].severity, EventSeverity::Warning);
        assert_eq!(recorder.events()[0].name, "blog-wp");

        recorder.clear();
        assert!(recorder.events().is_empty());
    }
}
