//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Products
//! GET  /products                        - Whole catalog
//! GET  /products/hot-deals              - Discounted products
//! GET  /products/whats-new              - Newest first
//! GET  /products/clearance              - Products tagged "clearance"
//! GET  /products/tagged/{tag}           - Products carrying a tag
//! GET  /products/explore                - Shuffled catalog
//! GET  /products/tags                   - All tags
//! GET  /products/{id}                   - Product with variations
//! GET  /products/{id}/variations        - All variations of a product
//! GET  /products/{id}/variations/{vid}  - One variation
//!
//! Listing routes accept repeatable attributeId/attributeTerm pairs,
//! category, order=asc|desc and page.
//!
//! # Taxonomy
//! GET  /attributes                      - All attributes
//! GET  /attributes/{id}                 - One attribute
//! GET  /categories                      - Top-level categories
//! GET  /categories/{id}                 - One category
//! GET  /categories/{id}/subcategories   - Child categories
//!
//! # Cache administration
//! GET  /cache/clear-cache               - Drop every cache entry
//! POST /cache/resync                    - Force a full snapshot rebuild
//! GET  /cache/init                      - Start a background warm-up
//! ```

pub mod admin;
pub mod products;
pub mod taxonomy;

use axum::{
    Router,
    routing::{get, post},
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Parse a numeric path id, naming the kind of id on failure.
pub(crate) fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid {what} id {raw:?}")))
}

/// Product query routes, nested under `/products`.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::all))
        .route("/hot-deals", get(products::hot_deals))
        .route("/whats-new", get(products::whats_new))
        .route("/clearance", get(products::clearance))
        .route("/tagged/{tag}", get(products::tagged))
        .route("/explore", get(products::explore))
        .route("/tags", get(products::tags))
        .route("/{id}", get(products::show))
        .route("/{id}/variations", get(products::variations))
        .route("/{id}/variations/{variation_id}", get(products::variation))
}

/// Attribute routes, nested under `/attributes`.
pub fn attribute_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(taxonomy::attributes))
        .route("/{id}", get(taxonomy::attribute))
}

/// Category routes, nested under `/categories`.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(taxonomy::categories))
        .route("/{id}", get(taxonomy::category))
        .route("/{id}/subcategories", get(taxonomy::subcategories))
}

/// Cache administration routes, nested under `/cache`.
pub fn cache_routes() -> Router<AppState> {
    Router::new()
        .route("/clear-cache", get(admin::clear_cache))
        .route("/resync", post(admin::resync))
        .route("/init", get(admin::init))
}

/// All API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/attributes", attribute_routes())
        .nest("/categories", category_routes())
        .nest("/cache", cache_routes())
}
