//! Tracing setup for the operator process.
//!
//! The level filter sits behind a reload layer so the configured
//! `logging.level` can replace the bootstrap level once configuration is
//! loaded. An explicit `RUST_LOG` always takes precedence.
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Builds the filter for `level`, unless `rust_log` holds a usable directive.
fn filter_for(level: &str, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

fn rust_log() -> Option<String> {
    std::env::var("RUST_LOG").ok().filter(|v| !v.is_empty())
}

pub fn init_tracing() {
    init_tracing_with_level("info");
}

pub fn init_tracing_with_level(level: &str) {
    let (reload_layer, handle) = reload::Layer::new(filter_for(level, rust_log().as_deref()));
    let _ = LOG_RELOAD_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Swaps the active level. A no-op before `init_tracing` or under `RUST_LOG`.
pub fn apply_logging_level(level: &str) {
    let Some(handle) = LOG_RELOAD_HANDLE.get() else {
        return;
    };
    let filter = filter_for(level, rust_log().as_deref());
    if let Err(err) = handle.reload(filter) {
        tracing::warn!(error = %err, level, "failed to apply logging level");
    } else {
        tracing::debug!(level, "logging level applied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_used_without_rust_log() {
        assert_eq!(filter_for("debug", None).to_string(), "debug");
    }

    #[test]
    fn rust_log_overrides_configured_level() {
        let filter = filter_for("info", Some("wpo_controller=trace"));
        assert_eq!(filter.to_string(), "wpo_controller=trace");
    }

    #[test]
    fn unparsable_rust_log_falls_back_to_level() {
        assert_eq!(filter_for("warn", Some("wpo_controller=loudest")).to_string(), "warn");
    }
}
