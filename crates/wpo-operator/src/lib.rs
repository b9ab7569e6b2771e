//! Process wiring for the Wordpress operator binary.
//!
//! - [`config`]: layered TOML/environment configuration
//! - [`observability`]: tracing subscriber with a reloadable level
//! - [`server`]: `/healthz` and `/readyz`
//! - [`bootstrap`]: manifest seeding at startup

pub mod bootstrap;
pub mod config;
pub mod observability;
pub mod server;
