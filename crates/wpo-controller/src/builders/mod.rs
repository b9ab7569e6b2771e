//! Desired shape of every child component.
//!
//! A builder overlays the fields the controller owns onto a child object,
//! which is either the current stored object or an empty skeleton. Fields the
//! builder does not touch (store-assigned identity, status, foreign labels)
//! survive unchanged. Builders are pure apart from the secret, which only
//! generates salts that are still missing.

mod deployment;
mod ingress;
mod pvc;
mod secret;
mod service;

use std::collections::{BTreeMap, HashMap};

use wpo_core::{Component, Kind, Object, ObjectKey, ObjectRef, Wordpress};

pub use secret::SALT_KEYS;

/// Records the `spec.labels` keys last applied to a child.
pub const APPLIED_LABELS_ANNOTATION: &str = "wordpress.presslabs.org/applied-labels";
/// Records the `spec.ingressAnnotations` keys last applied to the ingress.
pub const APPLIED_INGRESS_ANNOTATIONS_ANNOTATION: &str =
    "wordpress.presslabs.org/applied-ingress-annotations";

/// Errors computing a child's desired shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// A specification field is malformed.
    #[error("Invalid field {field}: {message}")]
    InvalidField { field: String, message: String },

    /// A child built earlier in the same pass is missing from the outputs.
    #[error("Missing dependency {kind} {name}")]
    MissingDependency { kind: Kind, name: String },

    /// The component is no longer produced, only reaped.
    #[error("Component {0} is retired")]
    Retired(Kind),
}

impl BuildError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing_dependency(kind: Kind, name: impl Into<String>) -> Self {
        Self::MissingDependency {
            kind,
            name: name.into(),
        }
    }
}

/// Committed objects produced by earlier syncers of the same pipeline run.
#[derive(Debug, Clone, Default)]
pub struct SyncOutputs {
    objects: HashMap<ObjectRef, Object>,
}

impl SyncOutputs {
    pub fn insert(&mut self, object: Object) {
        self.objects.insert(object.object_ref(), object);
    }

    pub fn get(&self, kind: Kind, key: &ObjectKey) -> Option<&Object> {
        self.objects.get(&ObjectRef::new(kind, key))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Computes the desired shape of one child object.
pub trait ChildBuilder: Send + Sync {
    fn kind(&self) -> Kind;

    /// Deterministic key of the child for `owner`.
    fn key(&self, owner: &Wordpress) -> ObjectKey;

    /// Overlays the desired fields onto `object`.
    ///
    /// The controller owner reference is set by the caller.
    fn build(
        &self,
        owner: &Wordpress,
        outputs: &SyncOutputs,
        object: &mut Object,
    ) -> Result<(), BuildError>;
}

impl ChildBuilder for Component {
    fn kind(&self) -> Kind {
        Component::kind(self)
    }

    fn key(&self, owner: &Wordpress) -> ObjectKey {
        owner.component_key(*self)
    }

    fn build(
        &self,
        owner: &Wordpress,
        outputs: &SyncOutputs,
        object: &mut Object,
    ) -> Result<(), BuildError> {
        let previous = object.metadata.annotations.get(APPLIED_LABELS_ANNOTATION).cloned();
        let applied = apply_tracked(
            &mut object.metadata.labels,
            owner.component_labels(*self),
            previous.as_deref(),
            owner.spec.labels.keys(),
        );
        set_record(&mut object.metadata.annotations, APPLIED_LABELS_ANNOTATION, applied);
        match self {
            Component::Secret => secret::build(object),
            Component::Deployment => deployment::build(owner, outputs, object),
            Component::Service => service::build(owner, object),
            Component::Ingress => ingress::build(owner, object),
            Component::CodePvc => pvc::build(owner.spec.code_claim(), "spec.code", object),
            Component::MediaPvc => pvc::build(owner.spec.media_claim(), "spec.media", object),
            Component::Cron => Err(BuildError::Retired(Kind::CronJob)),
        }
    }
}

/// Overlays `desired` onto `target` and drops keys that an earlier build
/// applied from the user's map but that are no longer desired.
///
/// `previous` is the comma-separated record of that earlier build; the
/// returned record lists `user_keys`. Keys never applied by a build are left
/// alone.
pub(crate) fn apply_tracked<'k>(
    target: &mut BTreeMap<String, String>,
    desired: BTreeMap<String, String>,
    previous: Option<&str>,
    user_keys: impl Iterator<Item = &'k String>,
) -> String {
    for stale in previous
        .into_iter()
        .flat_map(|record| record.split(','))
        .filter(|k| !k.is_empty() && !desired.contains_key(*k))
    {
        target.remove(stale);
    }
    target.extend(desired);
    user_keys.map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Stores `record` under `key`, or removes the annotation when empty.
pub(crate) fn set_record(annotations: &mut BTreeMap<String, String>, key: &str, record: String) {
    if record.is_empty() {
        annotations.remove(key);
    } else {
        annotations.insert(key.to_string(), record);
    }
}
