//! Web server module: the control API driven by the presentation layer.

mod handlers;

pub use handlers::*;

use crate::config::ServerConfig;
use crate::notify::Dispatcher;
use crate::probe::Relay;
use crate::scheduler::Scheduler;
use crate::store::TargetStore;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<TargetStore>,
    pub scheduler: Arc<Scheduler>,
    pub dispatcher: Arc<Dispatcher>,
    pub relay: Arc<dyn Relay>,
}

/// Web server for Javelin.
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes.
    pub fn routes(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            // Targets
            .route("/api/targets", get(handle_get_targets).post(handle_create_target))
            .route("/api/targets/batch", post(handle_create_batch))
            .route("/api/targets/pause-all", post(handle_toggle_pause_all))
            .route(
                "/api/targets/{id}",
                get(handle_get_target)
                    .put(handle_update_target)
                    .delete(handle_delete_target),
            )
            .route("/api/targets/{id}/pause", post(handle_toggle_pause))
            .route("/api/targets/{id}/check", post(handle_check_target))
            .route("/api/check-all", post(handle_check_all))
            // Engine
            .route("/api/monitoring", get(handle_get_monitoring).put(handle_set_monitoring))
            .route("/api/summary", get(handle_summary))
            .route("/api/config", get(handle_get_config).put(handle_update_config))
            .route("/api/notifications/test", post(handle_test_notifications))
            .route("/api/logs", get(handle_get_logs).delete(handle_clear_logs))
            // Snapshots
            .route("/api/export", get(handle_export))
            .route("/api/import", post(handle_import))
            // Relay
            .route("/api/proxy", get(handle_proxy))
            .route("/healthz", get(handle_health))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(DefaultBodyLimit::max(4 * 1024 * 1024)) // 4MB, imports carry history
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
