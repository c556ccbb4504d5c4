//! Presentation shell: HTML upload form, JSON prediction API and health check.

mod config;
mod error;
mod render;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use renewa_ai::LoadedModel;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::ServeConfig;
pub use error::ApiError;
pub use routes::{Confidence, HealthResponse, PredictionResponse};
pub use state::{AppState, SharedState};

/// Build the router over an already loaded model.
pub fn router(state: SharedState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(routes::index))
        .route("/predict", post(routes::predict_form))
        .route("/api/predict", post(routes::predict_json))
        .route("/health", get(routes::health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}

/// Serve `model` until Ctrl-C.
pub async fn serve(config: ServeConfig, model: LoadedModel) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let state = Arc::new(AppState::new(model, config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; serve until the process is killed.
        std::future::pending::<()>().await;
    }
}
