//! Single-object convergence.

use std::fmt;

use tracing::debug;
use wpo_core::{Kind, Object, ObjectRef, Wordpress};
use wpo_storage::ObjectStore;

use crate::builders::{BuildError, ChildBuilder, SyncOutputs};
use crate::error::ReconcileError;

/// Outcome of one syncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncResult {
    Unchanged,
    Created,
    Updated,
}

impl SyncResult {
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

/// A committed child and how it got there.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub object_ref: ObjectRef,
    pub result: SyncResult,
    /// The object as stored after this syncer ran.
    pub object: Object,
}

/// Drives one child object toward the shape its builder computes.
pub struct Syncer<'a, B> {
    owner: &'a Wordpress,
    builder: B,
}

impl<'a, B: ChildBuilder> Syncer<'a, B> {
    pub fn new(owner: &'a Wordpress, builder: B) -> Self {
        Self { owner, builder }
    }

    pub fn kind(&self) -> Kind {
        self.builder.kind()
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.builder.kind(), &self.builder.key(self.owner))
    }

    /// Computes the desired object from the current snapshot, without
    /// touching the store.
    ///
    /// The builder runs on a copy of `current` (or an empty skeleton when
    /// absent), after the controller owner reference is installed. The result
    /// is `Updated` only if the overlay changed anything.
    pub fn converge(
        &self,
        current: Option<Object>,
        outputs: &SyncOutputs,
    ) -> Result<(Object, SyncResult), ReconcileError> {
        let kind = self.builder.kind();
        let key = self.builder.key(self.owner);
        let exists = current.is_some();
        let base = current.unwrap_or_else(|| Object::new(kind, &key));

        if let Some(controller) = base.metadata.controller_owner() {
            if !controller.names(Kind::Wordpress, self.owner.name(), self.owner.uid()) {
                return Err(ReconcileError::builder(
                    kind,
                    key,
                    BuildError::invalid_field(
                        "metadata.ownerReferences",
                        format!("already controlled by {} {}", controller.kind, controller.name),
                    ),
                ));
            }
        }

        let mut desired = base.clone();
        desired
            .metadata
            .set_controller_reference(self.owner.owner_reference());
        self.builder
            .build(self.owner, outputs, &mut desired)
            .map_err(|source| ReconcileError::builder(kind, key.clone(), source))?;

        let result = if !exists {
            SyncResult::Created
        } else if desired != base {
            SyncResult::Updated
        } else {
            SyncResult::Unchanged
        };
        Ok((desired, result))
    }

    /// Reads the current object, converges it and persists the difference.
    pub async fn sync(
        &self,
        store: &dyn ObjectStore,
        outputs: &SyncOutputs,
    ) -> Result<SyncOutcome, ReconcileError> {
        let object_ref = self.object_ref();
        let key = object_ref.key();
        let current = store.get(object_ref.kind, &key).await?;
        let revision = current
            .as_ref()
            .and_then(|o| o.resource_version().map(str::to_string));

        let (desired, result) = self.converge(current, outputs)?;
        let object = match result {
            SyncResult::Unchanged => desired,
            SyncResult::Created => store.create(&desired).await?,
            SyncResult::Updated => store
                .update(&desired, revision.as_deref())
                .await
                .map_err(|err| ReconcileError::from_write(err, object_ref.kind, &key))?,
        };

        debug!(kind = %object_ref.kind, key = %key, result = %result, "Synced child object");
        Ok(SyncOutcome {
            object_ref,
            result,
            object,
        })
    }
}
