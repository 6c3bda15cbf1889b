//! Relay server setup
//!
//! Routes, listener binding and the process-level serve loop.

mod handler;
mod state;

pub use handler::{health_check, ws_handler, HealthResponse};
pub use state::RelayState;

use crate::registry::Registry;
use axum::{routing::get, Router};
use paint_common::{AppConfig, AppError};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the relay router
///
/// Anything that is not `/ws` or `/health` is served from `static_dir`.
pub fn create_router(static_dir: &str) -> Router<RelayState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .fallback_service(ServeDir::new(static_dir))
}

/// Build the complete application
pub fn create_app(state: RelayState) -> Router {
    create_router(&state.config().server.static_dir)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve `app` until `shutdown` resolves
pub async fn run_server<F>(app: Router, addr: &str, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("Starting relay server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::bind(addr, e))?;

    tracing::info!("Relay listening on ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(AppError::Server)?;

    Ok(())
}

/// Run the relay until Ctrl-C
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    run_until(config, shutdown_signal()).await
}

/// Run the relay until `signal` resolves, then stop the registry
///
/// Stopping the registry closes every queue, so each client gets a close frame.
pub async fn run_until<F>(config: AppConfig, signal: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.server.address();
    let grace = config.relay.write_timeout;

    let (registry, registry_task) = Registry::start(&config.relay);
    let app = create_app(RelayState::new(registry.clone(), config));

    let shutdown = {
        let registry = registry.clone();
        async move {
            signal.await;
            tracing::info!("Shutdown requested, closing all connections");
            registry.shutdown();
        }
    };

    let served = run_server(app, &addr, shutdown).await;

    // Covers the bind failure path, where the signal future never ran.
    registry.shutdown();
    let stopped = await_registry(registry_task, grace).await;

    served.and(stopped)
}

/// Wait up to `grace` for the registry task; a panicked task is an internal error
async fn await_registry(task: JoinHandle<()>, grace: Duration) -> Result<(), AppError> {
    match tokio::time::timeout(grace, task).await {
        Ok(Ok(())) => {
            tracing::info!("Registry stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Registry task failed");
            Err(AppError::internal(e))
        }
        Err(_) => {
            tracing::warn!("Registry did not stop in time");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
