//! Cache administration handlers.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::error::Result;
use crate::state::AppState;

/// `GET /cache/clear-cache`
pub async fn clear_cache(State(state): State<AppState>) -> Json<Value> {
    state.catalog().clear_all();
    Json(json!({ "message": "All caches cleared" }))
}

/// `POST /cache/resync`
///
/// Rebuilds the snapshot before answering. A failed rebuild leaves the
/// previous snapshot in place and reports upstream's status.
pub async fn resync(State(state): State<AppState>) -> Result<Json<Value>> {
    let snapshot = state.catalog().force_resync().await?;
    Ok(Json(json!({
        "message": "Snapshot rebuilt",
        "products": snapshot.len(),
        "total": snapshot.total,
        "timestamp": snapshot.created_at,
    })))
}

/// `GET /cache/init`
///
/// Starts a warm-up in the background and answers immediately.
pub async fn init(State(state): State<AppState>) -> Json<Value> {
    let catalog = state.catalog().clone();
    tokio::spawn(async move {
        catalog.warm().await;
    });
    Json(json!({
        "message": "Initiated successfully. Cache initialization will continue in the background."
    }))
}
