//! HTTP trigger endpoint.
//!
//! Lets a browser userscript hand URLs to the worker:
//! `GET /trigger?url=<url>` enqueues and answers `OK`, or `400 Err` without a url.
//! `GET /health` reports whether a task is running.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::core::error::AppResult;
use crate::download::queue::TaskSubmitter;

#[derive(Debug, Deserialize)]
struct TriggerParams {
    url: Option<String>,
}

/// Builds the router. Handlers only submit or read status.
pub fn router(submitter: TaskSubmitter) -> Router {
    Router::new()
        .route("/trigger", get(trigger_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(submitter)
}

async fn trigger_handler(
    State(submitter): State<TaskSubmitter>,
    Query(params): Query<TriggerParams>,
) -> impl IntoResponse {
    match params.url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
        Some(url) => {
            log::info!("🔗 Trigger received: {}", url);
            submitter.submit(url);
            (StatusCode::OK, "OK")
        }
        None => (StatusCode::BAD_REQUEST, "Err"),
    }
}

async fn health_handler(State(submitter): State<TaskSubmitter>) -> impl IntoResponse {
    let snapshot = submitter.status().snapshot();
    Json(json!({
        "status": "ok",
        "busy": snapshot.busy,
        "current_task": snapshot.current_task,
    }))
}

/// Binds `addr` and serves until the process exits.
pub async fn serve(addr: SocketAddr, submitter: TaskSubmitter) -> AppResult<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Starting trigger endpoint on http://{}", addr);
    log::info!("  /trigger?url=  - Enqueue a download");
    log::info!("  /health        - Worker status");
    axum::serve(listener, router(submitter)).await?;
    Ok(())
}
