//! Removal of retired child objects.
//!
//! Earlier releases ran WordPress cron as a separate `CronJob` named
//! `<name>-wp-cron`. It is deleted on every pass, but only when its controller
//! reference names the resource being reconciled.

use tracing::{debug, info};
use wpo_core::{Component, Kind, Wordpress};
use wpo_storage::{ObjectStore, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    /// Nothing by that name exists.
    Absent,
    /// An object by that name exists but belongs to someone else.
    NotOwned,
    Deleted,
}

/// Deletes the legacy cron job of `owner` if it exists and is owned by it.
///
/// The owner check accepts the lowercase kind written by older releases.
/// A deletion racing with another writer counts as absent.
pub async fn reap_legacy_cron(
    store: &dyn ObjectStore,
    owner: &Wordpress,
) -> Result<ReapOutcome, StorageError> {
    let key = owner.component_key(Component::Cron);
    let Some(existing) = store.get(Kind::CronJob, &key).await? else {
        return Ok(ReapOutcome::Absent);
    };

    if !existing
        .metadata
        .is_controlled_by(Kind::Wordpress, owner.name(), owner.uid())
    {
        debug!(key = %key, "Legacy cron job not owned by this resource, leaving it");
        return Ok(ReapOutcome::NotOwned);
    }

    match store.delete(Kind::CronJob, &key).await {
        Ok(_) => {
            info!(key = %key, owner = %owner.key(), "Deleted legacy cron job");
            Ok(ReapOutcome::Deleted)
        }
        Err(err) if err.is_not_found() => Ok(ReapOutcome::Absent),
        Err(err) => Err(err),
    }
}
