//! Core types shared by every crate of the Wordpress operator.
//!
//! - [`object`]: kinds, keys, metadata, owner references and the dynamic
//!   [`Object`] document every store backend persists
//! - [`wordpress`]: the `Wordpress` desired-state resource, its defaults and
//!   the deterministic naming of the child objects it owns
//! - [`events`]: change notifications broadcast after committed store writes

pub mod error;
pub mod events;
pub mod object;
pub mod time;
pub mod wordpress;

pub use error::{CoreError, Result};
pub use object::{Kind, Object, ObjectKey, ObjectMeta, ObjectRef, OwnerReference};
pub use time::now_rfc3339;
pub use wordpress::{
    CodeVolumeSpec, Component, EnvVar, MediaVolumeSpec, PersistentVolumeClaimSpec, RouteSpec,
    Wordpress, WordpressSpec, WordpressStatus,
};
