//! Change notifications for stored objects.
//!
//! Store backends never publish directly. The evented store wrapper sends an
//! [`ObjectEvent`] through the [`EventBroadcaster`] after each committed
//! write, and controllers subscribe to learn which keys need reconciling.
//!
//! ```text
//!   EventedStore ──send──▶ EventBroadcaster ──recv──▶ Controller watch loop
//!                          (broadcast channel)        (maps to owner key)
//! ```

pub mod broadcaster;
pub mod types;

pub use broadcaster::EventBroadcaster;
pub use types::{ObjectEvent, ObjectEventType};
