//! Cache keys and values for the catalog store.

use std::sync::Arc;

use catalog_proxy_core::{
    AttributeId, CategoryId, Facet, Product, ProductId, QuerySignature, Snapshot, Tag, VariationId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::cache::ExpiringCache;
use super::query::MatchSet;

/// The catalog's single shared store.
pub type CatalogCache = ExpiringCache<CacheKey, CacheValue>;

/// Cache key for every memoized catalog read.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    AllProducts,
    Facets,
    Tags,
    Attributes,
    Attribute(AttributeId),
    Categories,
    Category(CategoryId),
    Subcategories(CategoryId),
    Product(ProductId),
    Variations(ProductId),
    Variation(ProductId, VariationId),
    Query(QuerySignature),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Snapshot(Arc<Snapshot>),
    Facets(Arc<Vec<Facet>>),
    Tags(Arc<Vec<Tag>>),
    Listing(Arc<Listing>),
    Document(Arc<Value>),
    Product(Arc<ProductDetail>),
    Matches(Arc<MatchSet>),
}

/// A drained upstream listing passed through as-is.
#[derive(Debug, Clone)]
pub struct Listing {
    pub items: Vec<Value>,
    /// Upstream's total for the listing.
    pub total: u64,
    pub fetched_at: DateTime<Utc>,
}

/// A product document with its variations.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub product: Arc<Product>,
    /// Empty when the product has no variations.
    pub variations: Vec<Value>,
    #[serde(rename = "timestamp")]
    pub fetched_at: DateTime<Utc>,
}

/// Pull a typed value out of [`CacheValue`].
///
/// A key is only ever written with one variant, so a mismatch reads as a
/// miss.
pub trait FromCacheValue: Sized {
    fn from_cache_value(value: CacheValue) -> Option<Self>;
}

macro_rules! cache_variant {
    ($variant:ident => $ty:ty) => {
        impl FromCacheValue for $ty {
            fn from_cache_value(value: CacheValue) -> Option<Self> {
                match value {
                    CacheValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for CacheValue {
            fn from(inner: $ty) -> Self {
                Self::$variant(inner)
            }
        }
    };
}

cache_variant!(Snapshot => Arc<Snapshot>);
cache_variant!(Facets => Arc<Vec<Facet>>);
cache_variant!(Tags => Arc<Vec<Tag>>);
cache_variant!(Listing => Arc<Listing>);
cache_variant!(Document => Arc<Value>);
cache_variant!(Product => Arc<ProductDetail>);
cache_variant!(Matches => Arc<MatchSet>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_variant_extracts() {
        let tags = Arc::new(vec![Tag {
            id: 1.into(),
            name: "Clearance".to_string(),
            slug: "clearance".to_string(),
            count: 3,
        }]);
        let value = CacheValue::from(tags.clone());

        let extracted = <Arc<Vec<Tag>>>::from_cache_value(value);
        assert!(extracted.is_some_and(|t| Arc::ptr_eq(&t, &tags)));
    }

    #[test]
    fn test_mismatched_variant_is_a_miss() {
        let value = CacheValue::Document(Arc::new(Value::Null));
        assert!(<Arc<Snapshot>>::from_cache_value(value).is_none());
    }

    #[test]
    fn test_query_keys_are_distinct_per_signature() {
        use catalog_proxy_core::{CatalogQuery, Segment, SortOrder};

        let plain = CatalogQuery::segment(Segment::All);
        let mut ordered = plain.clone();
        ordered.order = Some(SortOrder::Desc);

        assert_ne!(
            CacheKey::Query(plain.signature()),
            CacheKey::Query(ordered.signature())
        );
        assert_ne!(CacheKey::Category(5.into()), CacheKey::Subcategories(5.into()));
    }
}
