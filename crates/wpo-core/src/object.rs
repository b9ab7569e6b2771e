//! Object model shared by the store, the controller and the builders.
//!
//! Every persisted object is an [`Object`]: a dynamic document with the
//! well-known `apiVersion`, `kind` and `metadata` envelope and an arbitrary
//! JSON body (`spec`, `data`, `status`, ...). Typed resources such as
//! [`crate::Wordpress`] convert to and from it through serde.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// The closed set of object kinds the operator reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    /// The desired-state resource.
    Wordpress,
    /// The workload running the site.
    Deployment,
    Secret,
    Service,
    Ingress,
    PersistentVolumeClaim,
    /// Retired child kind, only ever deleted.
    CronJob,
}

impl Kind {
    /// All kinds, in declaration order.
    pub const ALL: [Kind; 7] = [
        Kind::Wordpress,
        Kind::Deployment,
        Kind::Secret,
        Kind::Service,
        Kind::Ingress,
        Kind::PersistentVolumeClaim,
        Kind::CronJob,
    ];

    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Wordpress => "Wordpress",
            Kind::Deployment => "Deployment",
            Kind::Secret => "Secret",
            Kind::Service => "Service",
            Kind::Ingress => "Ingress",
            Kind::PersistentVolumeClaim => "PersistentVolumeClaim",
            Kind::CronJob => "CronJob",
        }
    }

    /// Returns the `apiVersion` objects of this kind are written with.
    pub fn api_version(&self) -> &'static str {
        match self {
            Kind::Wordpress => "wordpress.presslabs.org/v1alpha1",
            Kind::Deployment => "apps/v1",
            Kind::Secret | Kind::Service | Kind::PersistentVolumeClaim => "v1",
            Kind::Ingress => "networking.k8s.io/v1",
            Kind::CronJob => "batch/v1beta1",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Kind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::invalid_kind(s))
    }
}

/// Stable identity of an object within a kind: `(namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A `(kind, namespace, name)` triple identifying one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: Kind,
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: Kind, key: &ObjectKey) -> Self {
        Self {
            kind,
            namespace: key.namespace.clone(),
            name: key.name.clone(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Back-pointer from a child object to the object that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    /// Kept as a string: objects written by older releases may use a
    /// lowercase kind.
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_owner_deletion: Option<bool>,
}

impl OwnerReference {
    /// Builds a controller reference pointing at `kind`/`meta`.
    pub fn controller(kind: Kind, meta: &ObjectMeta) -> Self {
        Self {
            api_version: kind.api_version().to_string(),
            kind: kind.as_str().to_string(),
            name: meta.name.clone(),
            uid: meta.uid.clone().unwrap_or_default(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    pub fn is_controller(&self) -> bool {
        self.controller.unwrap_or(false)
    }

    /// Returns `true` when this reference names the given owner.
    ///
    /// Kinds compare case-insensitively. Uids are compared only when both
    /// sides carry one.
    pub fn names(&self, kind: Kind, name: &str, uid: Option<&str>) -> bool {
        if !self.kind.eq_ignore_ascii_case(kind.as_str()) || self.name != name {
            return false;
        }
        match uid {
            Some(uid) if !uid.is_empty() && !self.uid.is_empty() => self.uid == uid,
            _ => true,
        }
    }
}

/// Standard object metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    /// Assigned by the store on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Optimistic concurrency token, bumped on every committed write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    /// The owner reference flagged as controller, if any.
    pub fn controller_owner(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.is_controller())
    }

    /// Returns `true` when the controller owner reference names the given owner.
    pub fn is_controlled_by(&self, kind: Kind, name: &str, uid: Option<&str>) -> bool {
        self.controller_owner()
            .is_some_and(|owner| owner.names(kind, name, uid))
    }

    /// Installs `owner` as the controller reference.
    ///
    /// An existing reference to the same owner is replaced in place; any other
    /// controller reference is demoted so exactly one controller remains.
    pub fn set_controller_reference(&mut self, owner: OwnerReference) {
        let mut replaced = false;
        for existing in &mut self.owner_references {
            if existing.kind.eq_ignore_ascii_case(&owner.kind) && existing.name == owner.name {
                *existing = owner.clone();
                replaced = true;
            } else if existing.is_controller() {
                existing.controller = Some(false);
            }
        }
        if !replaced {
            self.owner_references.push(owner);
        }
    }
}

/// A dynamic object document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    pub api_version: String,
    pub kind: Kind,
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Everything besides the envelope: `spec`, `data`, `status`, ...
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Object {
    /// Creates an empty object of `kind` at `key`.
    pub fn new(kind: Kind, key: &ObjectKey) -> Self {
        Self {
            api_version: kind.api_version().to_string(),
            kind,
            metadata: ObjectMeta::new(&key.namespace, &key.name),
            body: Map::new(),
        }
    }

    /// Converts a typed resource into a dynamic object.
    pub fn from_typed<T: Serialize>(typed: &T) -> Result<Self> {
        let value = serde_json::to_value(typed)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Converts this object into a typed resource.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.kind, &self.key())
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata.resource_version.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.body.insert(name.into(), value);
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.body.remove(name)
    }

    /// Runs `f` against the named body field as a JSON object. A missing or
    /// non-object value is replaced with an empty object first.
    pub fn update_object_field<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Map<String, Value>) -> R,
    ) -> R {
        let slot = self.body.entry(name.to_string()).or_insert(Value::Null);
        let mut map = match std::mem::take(slot) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let out = f(&mut map);
        *slot = Value::Object(map);
        out
    }

    pub fn status(&self) -> Option<&Value> {
        self.body.get("status")
    }

    /// Reads an integer at a JSON pointer inside the body, e.g. `/status/replicas`.
    pub fn pointer_i64(&self, pointer: &str) -> Option<i64> {
        let (head, rest) = split_pointer(pointer)?;
        let root = self.body.get(head)?;
        if rest.is_empty() {
            root.as_i64()
        } else {
            root.pointer(rest).and_then(Value::as_i64)
        }
    }
}

fn split_pointer(pointer: &str) -> Option<(&str, &str)> {
    let trimmed = pointer.strip_prefix('/')?;
    match trimmed.find('/') {
        Some(idx) => Some((&trimmed[..idx], &trimmed[idx..])),
        None => Some((trimmed, "")),
    }
}
