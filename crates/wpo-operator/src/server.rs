use std::net::SocketAddr;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use wpo_controller::runtime::Readiness;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn build_app(readiness: Readiness) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(readiness)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Ready once the controller has queued its initial listing.
async fn readyz(State(readiness): State<Readiness>) -> impl IntoResponse {
    if readiness.is_ready() {
        (StatusCode::OK, Json(HealthResponse { status: "ready" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse { status: "starting" }),
        )
    }
}

/// Serves the health endpoints until `shutdown` is cancelled.
pub async fn serve(
    addr: SocketAddr,
    readiness: Readiness,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "health endpoints listening");
    axum::serve(listener, build_app(readiness))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn status(app: Router, path: &str) -> StatusCode {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn healthz_is_always_ok() {
        let app = build_app(Readiness::default());
        assert_eq!(status(app, "/healthz").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readyz_reports_starting_before_initial_list() {
        let app = build_app(Readiness::default());
        assert_eq!(status(app, "/readyz").await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn readyz_is_ok_once_controller_listed() {
        use std::sync::Arc;
        use wpo_controller::{Controller, ControllerConfig, TracingRecorder, WordpressReconciler};
        use wpo_core::events::EventBroadcaster;
        use wpo_storage::{DynStore, EventedStore};

        let broadcaster = EventBroadcaster::new_shared();
        let store: DynStore = Arc::new(EventedStore::new(
            wpo_db_memory::InMemoryStore::new(),
            broadcaster.clone(),
        ));
        let controller = Controller::new(
            WordpressReconciler::new(store, Arc::new(TracingRecorder)),
            broadcaster,
            ControllerConfig::default(),
        );
        let readiness = controller.readiness();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(controller.run(shutdown.clone()));

        while !readiness.is_ready() {
            tokio::task::yield_now().await;
        }
        assert_eq!(status(build_app(readiness), "/readyz").await, StatusCode::OK);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let app = build_app(Readiness::default());
        assert_eq!(status(app, "/metrics").await, StatusCode::NOT_FOUND);
    }
}
