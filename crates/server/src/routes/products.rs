//! Product route handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, RawQuery, State},
};
use catalog_proxy_core::{CatalogQuery, ProductId, QueryResult, Segment, Tag, VariationId};
use serde_json::{Value, json};

use crate::catalog::{CLEARANCE_TAG, CatalogError, ProductDetail};
use super::parse_id;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Parse the raw query string for a segment.
///
/// Filter parameters repeat, so the query string is decoded as ordered
/// pairs rather than into a map.
fn parse_query(segment: Segment, raw: Option<&str>) -> Result<CatalogQuery> {
    let pairs = url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes());
    CatalogQuery::from_pairs(segment, pairs).map_err(|e| AppError::from(CatalogError::from(e)))
}

async fn run(state: &AppState, segment: Segment, raw: Option<String>) -> Result<Json<QueryResult>> {
    let query = parse_query(segment, raw.as_deref())?;
    Ok(Json(state.catalog().query(&query).await?))
}

/// `GET /products`
pub async fn all(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Json<QueryResult>> {
    run(&state, Segment::All, raw).await
}

/// `GET /products/hot-deals`
pub async fn hot_deals(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<QueryResult>> {
    run(&state, Segment::OnSale, raw).await
}

/// `GET /products/whats-new`
pub async fn whats_new(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<QueryResult>> {
    run(&state, Segment::Recent, raw).await
}

/// `GET /products/clearance`
pub async fn clearance(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<QueryResult>> {
    run(&state, Segment::Tagged(CLEARANCE_TAG.to_string()), raw).await
}

/// `GET /products/tagged/{tag}`
pub async fn tagged(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Json<QueryResult>> {
    run(&state, Segment::Tagged(tag), raw).await
}

/// `GET /products/explore`
pub async fn explore(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<QueryResult>> {
    run(&state, Segment::Explore, raw).await
}

/// `GET /products/tags`
pub async fn tags(State(state): State<AppState>) -> Result<Json<Arc<Vec<Tag>>>> {
    Ok(Json(state.catalog().tags().await?))
}

/// `GET /products/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Arc<ProductDetail>>> {
    let id: ProductId = parse_id(&id, "product")?;
    Ok(Json(state.catalog().product(id).await?))
}

/// `GET /products/{id}/variations`
pub async fn variations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id: ProductId = parse_id(&id, "product")?;
    let listing = state.catalog().variations(id).await?;
    Ok(Json(json!({
        "data": listing.items,
        "totalVariations": listing.total,
        "timestamp": listing.fetched_at,
    })))
}

/// `GET /products/{id}/variations/{variation_id}`
pub async fn variation(
    State(state): State<AppState>,
    Path((id, variation)): Path<(String, String)>,
) -> Result<Json<Arc<Value>>> {
    let id: ProductId = parse_id(&id, "product")?;
    let variation: VariationId = parse_id(&variation, "variation")?;
    Ok(Json(state.catalog().variation(id, variation).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use catalog_proxy_core::{AttributeId, SortOrder};

    #[test]
    fn test_parse_query_keeps_repeated_pairs() {
        let query = parse_query(
            Segment::All,
            Some("attributeId=1&attributeTerm=Red%20Wine&attributeId=2&attributeTerm=large&order=asc&page=2"),
        )
        .unwrap();

        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0].attribute_id, AttributeId::new(1));
        assert_eq!(query.filters[0].term, "Red Wine");
        assert_eq!(query.order, Some(SortOrder::Asc));
        assert_eq!(query.page, 2);
    }

    #[test]
    fn test_parse_query_without_query_string() {
        let query = parse_query(Segment::Explore, None).unwrap();
        assert!(query.filters.is_empty());
        assert_eq!(query.page, 1);
    }

    #[test]
    fn test_parse_query_reads_category() {
        let query = parse_query(Segment::All, Some("category=7&order=desc")).unwrap();
        assert_eq!(query.category, Some(catalog_proxy_core::CategoryId::new(7)));

        let err = parse_query(Segment::All, Some("category=shirts")).unwrap_err();
        assert!(matches!(err, AppError::Catalog(CatalogError::InvalidQuery(_))));
    }

    #[test]
    fn test_parse_query_rejects_unpaired_filter() {
        let err = parse_query(Segment::All, Some("attributeId=1")).unwrap_err();
        assert!(matches!(err, AppError::Catalog(CatalogError::InvalidQuery(_))));
    }
}
