//! Event type definitions.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::object::{Kind, Object, ObjectKey, OwnerReference};

/// Type of object change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectEventType {
    Created,
    Updated,
    Deleted,
}

impl ObjectEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectEventType::Created => "created",
            ObjectEventType::Updated => "updated",
            ObjectEventType::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ObjectEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed change to one stored object.
///
/// Carries the owner references of the object as it was written (or as it
/// was just before deletion) so watchers can route child changes to the
/// owning resource without a store round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEvent {
    pub event_type: ObjectEventType,
    pub kind: Kind,
    pub key: ObjectKey,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ObjectEvent {
    pub fn new(event_type: ObjectEventType, object: &Object) -> Self {
        Self {
            event_type,
            kind: object.kind,
            key: object.key(),
            owner_references: object.metadata.owner_references.clone(),
            resource_version: object.metadata.resource_version.clone(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn created(object: &Object) -> Self {
        Self::new(ObjectEventType::Created, object)
    }

    pub fn updated(object: &Object) -> Self {
        Self::new(ObjectEventType::Updated, object)
    }

    pub fn deleted(object: &Object) -> Self {
        Self::new(ObjectEventType::Deleted, object)
    }

    /// Owner reference flagged as controller, if any.
    pub fn controller_owner(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.is_controller())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectMeta;

    #[test]
    fn test_event_carries_owner_references() {
        let mut owner = ObjectMeta::new("default", "blog");
        owner.uid = Some("uid-1".into());

        let mut object = Object::new(Kind::Service, &ObjectKey::new("default", "blog"));
        object
            .metadata
            .set_controller_reference(OwnerReference::controller(Kind::Wordpress, &owner));
        object.metadata.resource_version = Some("7".into());

        let event = ObjectEvent::updated(&object);
        assert_eq!(event.event_type, ObjectEventType::Updated);
        assert_eq!(event.kind, Kind::Service);
        assert_eq!(event.resource_version.as_deref(), Some("7"));
        assert_eq!(event.controller_owner().map(|r| r.name.as_str()), Some("blog"));
    }

    #[test]
    fn test_event_type_display() {
        assert_eq!(ObjectEventType::Deleted.to_string(), "deleted");
    }
}
