//! Schema migration of deprecated specification fields.
//!
//! The schema version is implicit: a populated `domains` list with empty
//! `routes` marks a document written against the old schema.

use wpo_core::wordpress::DEFAULT_ROUTE_PATH;
use wpo_core::{RouteSpec, WordpressSpec};

/// Migrated copy of a specification.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutcome {
    pub spec: WordpressSpec,
    /// `true` when the copy must be persisted before syncing.
    pub changed: bool,
}

/// Upgrades deprecated fields without touching the input.
///
/// When `routes` is empty, one root-path route is synthesized per legacy
/// domain. The legacy list is always cleared on the copy; `changed` is only
/// set when routes were synthesized, so a stale `domains` list next to
/// populated routes never forces a write.
pub fn migrate(spec: &WordpressSpec) -> MigrationOutcome {
    let mut migrated = spec.clone();
    let mut changed = false;

    if migrated.routes.is_empty() && !migrated.domains.is_empty() {
        migrated.routes = migrated
            .domains
            .iter()
            .map(|domain| RouteSpec::new(domain, DEFAULT_ROUTE_PATH))
            .collect();
        changed = true;
    }
    migrated.domains.clear();

    MigrationOutcome {
        spec: migrated,
        changed,
    }
}
