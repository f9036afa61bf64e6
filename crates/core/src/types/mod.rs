//! Core types for the catalog proxy.
//!
//! This module provides type-safe wrappers for the catalog domain.

pub mod id;
pub mod price;
pub mod product;
pub mod query;
pub mod snapshot;
pub mod taxonomy;

pub use id::*;
pub use price::{PriceError, parse_amount, positive_amount};
pub use product::{CategoryRef, Product, ProductAttribute, TagRef};
pub use query::{
    ATTRIBUTE_ID_PARAM, ATTRIBUTE_TERM_PARAM, AttributeFilter, CATEGORY_PARAM, CatalogQuery, ORDER_PARAM,
    PAGE_PARAM, QueryError, QueryResult, QuerySignature, Segment, SortOrder,
};
pub use snapshot::Snapshot;
pub use taxonomy::{Attribute, AttributeTerm, Category, Facet, FacetTerm, Tag, fold_case};
