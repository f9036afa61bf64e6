//! WooCommerce REST API access.
//!
//! # Architecture
//!
//! - [`CatalogSource`] is the seam between the catalog and upstream. It
//!   exposes exactly two primitives: one page of a listing, or one document.
//! - [`WooClient`] implements it over `reqwest` against `wc/v3`.
//! - No retries. Every call is a single request; callers own retry policy.
//!
//! Listing totals come from the `X-WP-Total` response header, which is
//! authoritative for the moment of the call even though the store is live.
//! A response without the header carries no total.

mod client;

pub use client::WooClient;

use std::fmt;

use async_trait::async_trait;
use catalog_proxy_core::{AttributeId, CategoryId, ProductId, VariationId};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Largest page size upstream accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Header carrying the total item count of a listing.
pub const TOTAL_HEADER: &str = "x-wp-total";

/// An upstream REST resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Products,
    Product(ProductId),
    Variations(ProductId),
    Variation(ProductId, VariationId),
    Attributes,
    Attribute(AttributeId),
    AttributeTerms(AttributeId),
    Tags,
    Categories,
    Category(CategoryId),
}

impl Resource {
    /// Path relative to the versioned API root.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Products => "products".to_string(),
            Self::Product(id) => format!("products/{id}"),
            Self::Variations(id) => format!("products/{id}/variations"),
            Self::Variation(id, variation) => format!("products/{id}/variations/{variation}"),
            Self::Attributes => "products/attributes".to_string(),
            Self::Attribute(id) => format!("products/attributes/{id}"),
            Self::AttributeTerms(id) => format!("products/attributes/{id}/terms"),
            Self::Tags => "products/tags".to_string(),
            Self::Categories => "products/categories".to_string(),
            Self::Category(id) => format!("products/categories/{id}"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total item count across all pages, when upstream reported one.
    pub total: Option<u64>,
}

/// Number of pages needed to hold `total` items.
#[must_use]
pub fn total_pages(total: u64, per_page: u32) -> u32 {
    let pages = total.div_ceil(u64::from(per_page.max(1)));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Errors talking to upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status} for {resource}")]
    Status {
        resource: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response (connect failure, timeout).
    #[error("upstream request for {resource} failed: {source}")]
    Transport {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not valid JSON for the expected type.
    #[error("could not decode upstream {resource} response: {source}")]
    Decode {
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response was JSON but not the expected shape (e.g. not an array).
    #[error("unexpected upstream {resource} response: expected {expected}")]
    UnexpectedShape {
        resource: String,
        expected: &'static str,
    },
}

impl UpstreamError {
    /// HTTP status upstream answered with, if it answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw upstream response body, if one was received.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Read access to the upstream catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch one page of a listing.
    ///
    /// `page` is 1-based and `per_page` is clamped to `1..=MAX_PAGE_SIZE`.
    async fn fetch_page(
        &self,
        resource: &Resource,
        params: &[(String, String)],
        page: u32,
        per_page: u32,
    ) -> Result<Page<Value>, UpstreamError>;

    /// Fetch a single document.
    async fn fetch_one(&self, resource: &Resource) -> Result<Value, UpstreamError>;
}

/// Decode an upstream JSON document.
///
/// # Errors
///
/// Returns `UpstreamError::Decode` if the document does not match `T`.
pub fn decode<T: DeserializeOwned>(resource: &Resource, value: Value) -> Result<T, UpstreamError> {
    serde_json::from_value(value).map_err(|source| UpstreamError::Decode {
        resource: resource.path(),
        source,
    })
}

/// Decode every item of a listing, failing on the first bad item.
///
/// # Errors
///
/// Returns `UpstreamError::Decode` for the first item that does not match `T`.
pub fn decode_all<T: DeserializeOwned>(
    resource: &Resource,
    items: Vec<Value>,
) -> Result<Vec<T>, UpstreamError> {
    items.into_iter().map(|item| decode(resource, item)).collect()
}
