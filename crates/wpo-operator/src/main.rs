use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use wpo_controller::{Controller, TracingRecorder, WordpressReconciler};
use wpo_core::events::EventBroadcaster;
use wpo_db_memory::InMemoryStore;
use wpo_operator::config::{AppConfig, loader::load_config};
use wpo_operator::{bootstrap, observability, server};
use wpo_storage::{DynStore, EventedStore};

#[derive(Debug, Parser)]
#[command(name = "wpo-operator", version, about = "Wordpress desired-state controller")]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, env = "WPO_CONFIG")]
    config: Option<PathBuf>,

    /// Number of concurrent reconciliation workers
    #[arg(long)]
    workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(&self, cfg: &mut AppConfig) {
        if let Some(workers) = self.workers {
            cfg.controller.workers = workers;
        }
        if let Some(level) = &self.log_level {
            cfg.logging.level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    let args = Args::parse();
    let cfg = match load_config(args.config.as_deref()).and_then(|mut cfg| {
        args.apply(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    observability::apply_logging_level(&cfg.logging.level);
    tracing::info!(
        workers = cfg.controller.workers,
        addr = %cfg.addr(),
        "configuration loaded"
    );

    if let Err(err) = run(cfg).await {
        tracing::error!(error = %err, "operator stopped with error");
        eprintln!("Operator error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let broadcaster = EventBroadcaster::new_shared();
    let store: DynStore = Arc::new(EventedStore::new(InMemoryStore::new(), broadcaster.clone()));

    if let Some(dir) = &cfg.bootstrap.manifests_dir {
        bootstrap::seed_store(&*store, dir).await?;
    }

    let reconciler = WordpressReconciler::new(store, Arc::new(TracingRecorder));
    let controller = Controller::new(
        reconciler,
        broadcaster,
        cfg.controller.to_controller_config(),
    );
    let readiness = controller.readiness();

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    // A health listener failure stops the controller too.
    let health = tokio::spawn({
        let shutdown = shutdown.clone();
        let addr = cfg.addr();
        async move {
            let result = server::serve(addr, readiness, shutdown.clone()).await;
            if result.is_err() {
                shutdown.cancel();
            }
            result
        }
    });
    let result = controller.run(shutdown.clone()).await;
    shutdown.cancel();

    health.await??;
    result?;
    tracing::info!("operator stopped");
    Ok(())
}
