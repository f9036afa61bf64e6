//! Attribute and category route handlers.
//!
//! Single documents are passed through untouched. Listings are wrapped with
//! upstream's total.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use catalog_proxy_core::{AttributeId, CategoryId};
use serde_json::{Value, json};

use super::parse_id;
use crate::error::Result;
use crate::state::AppState;

/// `GET /attributes`
pub async fn attributes(State(state): State<AppState>) -> Result<Json<Value>> {
    let listing = state.catalog().attributes().await?;
    Ok(Json(json!({
        "data": listing.items,
        "totalAttributes": listing.total,
        "timestamp": listing.fetched_at,
    })))
}

/// `GET /attributes/{id}`
pub async fn attribute(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Arc<Value>>> {
    let id: AttributeId = parse_id(&id, "attribute")?;
    Ok(Json(state.catalog().attribute(id).await?))
}

/// `GET /categories`
///
/// Top-level categories only, as a bare array.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Value>> {
    let listing = state.catalog().categories().await?;
    Ok(Json(Value::Array(listing.items.clone())))
}

/// `GET /categories/{id}`
pub async fn category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Arc<Value>>> {
    let id: CategoryId = parse_id(&id, "category")?;
    Ok(Json(state.catalog().category(id).await?))
}

/// `GET /categories/{id}/subcategories`
pub async fn subcategories(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id: CategoryId = parse_id(&id, "category")?;
    let listing = state.catalog().subcategories(id).await?;
    Ok(Json(json!({
        "data": listing.items,
        "totalSubcategories": listing.total,
        "timestamp": listing.fetched_at,
    })))
}
