//! Catalog query and result types.
//!
//! A [`CatalogQuery`] is built from the raw, repeatable query-string pairs of
//! an inbound request. Filters pair the i-th `attributeId` with the i-th
//! `attributeTerm`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{AttributeId, CategoryId};
use super::product::Product;
use super::taxonomy::{Facet, fold_case};

/// Query-string key carrying a filter's attribute id.
pub const ATTRIBUTE_ID_PARAM: &str = "attributeId";
/// Query-string key carrying a filter's term.
pub const ATTRIBUTE_TERM_PARAM: &str = "attributeTerm";
/// Query-string key restricting results to one category.
pub const CATEGORY_PARAM: &str = "category";
/// Query-string key carrying the order token.
pub const ORDER_PARAM: &str = "order";
/// Query-string key carrying the page number.
pub const PAGE_PARAM: &str = "page";

/// Errors building a query from request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("every attributeId needs a matching attributeTerm (got {ids} ids and {terms} terms)")]
    UnpairedFilter { ids: usize, terms: usize },
    #[error("invalid attributeId: {0:?}")]
    InvalidAttributeId(String),
    #[error("invalid category: {0:?}")]
    InvalidCategory(String),
    #[error("attributeTerm must not be empty")]
    EmptyTerm,
    #[error("invalid order {0:?}, expected \"asc\" or \"desc\"")]
    InvalidOrder(String),
}

/// A predefined named subset of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Whole catalog in snapshot order.
    All,
    /// Products with a positive sale price below the regular price.
    OnSale,
    /// Newest first.
    Recent,
    /// Products carrying the named tag (matched by name or slug).
    Tagged(String),
    /// Whole catalog, shuffled unless an order is requested.
    Explore,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::OnSale => f.write_str("on-sale"),
            Self::Recent => f.write_str("recent"),
            Self::Tagged(tag) => write!(f, "tagged:{tag}"),
            Self::Explore => f.write_str("explore"),
        }
    }
}

/// Direction for effective-price ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(QueryError::InvalidOrder(s.to_string()))
        }
    }
}

/// One `(attributeId, term)` filter pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeFilter {
    pub attribute_id: AttributeId,
    pub term: String,
}

impl AttributeFilter {
    #[must_use]
    pub fn new(attribute_id: AttributeId, term: impl Into<String>) -> Self {
        Self {
            attribute_id,
            term: term.into(),
        }
    }
}

/// A fully-parsed catalog query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub segment: Segment,
    /// Restrict the segment to products listed in this category.
    pub category: Option<CategoryId>,
    pub filters: Vec<AttributeFilter>,
    pub order: Option<SortOrder>,
    /// 1-based page number.
    pub page: usize,
}

/// Cache signature of a query: segment, category, filters and order,
/// without the page.
///
/// Tag names and terms are case-folded, filters sorted and deduplicated, so
/// queries that select the same products share one signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature {
    segment: Segment,
    category: Option<CategoryId>,
    filters: Vec<AttributeFilter>,
    order: Option<SortOrder>,
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segment)?;
        if let Some(category) = self.category {
            write!(f, " category={category}")?;
        }
        for filter in &self.filters {
            write!(f, " {}={:?}", filter.attribute_id, filter.term)?;
        }
        write!(f, " order={}", self.order.map_or("none", SortOrder::as_str))
    }
}

impl CatalogQuery {
    /// A query for page 1 of a segment with no filters.
    #[must_use]
    pub const fn segment(segment: Segment) -> Self {
        Self {
            segment,
            category: None,
            filters: Vec::new(),
            order: None,
            page: 1,
        }
    }

    /// Parse a query from decoded query-string pairs.
    ///
    /// Unknown keys are ignored. A missing, non-numeric or zero page falls
    /// back to page 1.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` when ids and terms are unpaired, an attribute or
    /// category id is not a number, a term is empty, or the order token is
    /// unknown.
    pub fn from_pairs<I, K, V>(segment: Segment, pairs: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut ids = Vec::new();
        let mut terms = Vec::new();
        let mut category = None;
        let mut order = None;
        let mut page = 1;

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                ATTRIBUTE_ID_PARAM => ids.push(
                    value
                        .parse::<AttributeId>()
                        .map_err(|_| QueryError::InvalidAttributeId(value.to_string()))?,
                ),
                ATTRIBUTE_TERM_PARAM => {
                    let term = value.trim();
                    if term.is_empty() {
                        return Err(QueryError::EmptyTerm);
                    }
                    terms.push(term.to_string());
                }
                CATEGORY_PARAM if !value.trim().is_empty() => {
                    category = Some(
                        value
                            .trim()
                            .parse::<CategoryId>()
                            .map_err(|_| QueryError::InvalidCategory(value.to_string()))?,
                    );
                }
                ORDER_PARAM if !value.trim().is_empty() => {
                    order = Some(value.trim().parse::<SortOrder>()?);
                }
                PAGE_PARAM => {
                    page = value.trim().parse::<usize>().ok().filter(|p| *p > 0).unwrap_or(1);
                }
                _ => {}
            }
        }

        if ids.len() != terms.len() {
            return Err(QueryError::UnpairedFilter {
                ids: ids.len(),
                terms: terms.len(),
            });
        }

        let filters = ids
            .into_iter()
            .zip(terms)
            .map(|(attribute_id, term)| AttributeFilter { attribute_id, term })
            .collect();

        Ok(Self {
            segment,
            category,
            filters,
            order,
            page,
        })
    }

    /// Derive the cache signature.
    ///
    /// Filters are combined by union, so their order is irrelevant; they are
    /// sorted and deduplicated (terms case-folded) before being keyed.
    #[must_use]
    pub fn signature(&self) -> QuerySignature {
        let mut filters: Vec<AttributeFilter> = self
            .filters
            .iter()
            .map(|f| AttributeFilter::new(f.attribute_id, fold_case(&f.term)))
            .collect();
        filters.sort();
        filters.dedup();

        let segment = match &self.segment {
            Segment::Tagged(tag) => Segment::Tagged(fold_case(tag)),
            other => other.clone(),
        };

        QuerySignature {
            segment,
            category: self.category,
            filters,
            order: self.order,
        }
    }
}

/// One page of a query's matches plus the facets describing the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub data: Vec<Arc<Product>>,
    /// Number of products matching the query.
    pub total_products: usize,
    /// Number of products in the segment before attribute filtering.
    pub total_unfiltered: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub facets: Arc<Vec<Facet>>,
    pub timestamp: DateTime<Utc>,
}
