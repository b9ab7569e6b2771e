//! Dispatcher that turns change notifications into reconciliation passes.
//!
//! ```text
//!  EventBroadcaster ──▶ watch loop ──add──▶ WorkQueue ──get──▶ workers ──▶ WordpressReconciler
//!                        (owner key)          ▲                   │
//!                                             └──add_after(backoff)┘ on retryable failure
//! ```

mod backoff;
mod controller;
mod queue;

pub use backoff::Backoff;
pub use controller::{Controller, ControllerConfig, Readiness, key_for_event};
pub use queue::WorkQueue;
