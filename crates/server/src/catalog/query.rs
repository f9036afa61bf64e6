//! Query evaluation over a snapshot.
//!
//! Everything here is synchronous and pure: it borrows the snapshot, never
//! mutates it, and returns new `Arc` handles to the matched products.
//!
//! The pipeline is split at the cache boundary:
//!
//! 1. [`match_products`] runs segment selection, attribute filtering and
//!    ordering, producing a [`MatchSet`] that is cached per query signature.
//! 2. [`paginate`] cuts one page from a `MatchSet` and attaches facets.

use std::collections::HashSet;
use std::sync::Arc;

use catalog_proxy_core::{
    AttributeFilter, CategoryId, Facet, Product, QueryResult, Segment, Snapshot, SortOrder, Tag,
    TagId, fold_case,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

/// Products per page when not configured.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A segment with its tag name resolved to an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    OnSale,
    Recent,
    Tagged(TagId),
    Explore,
}

impl Selection {
    /// Resolve a segment against the tag list.
    ///
    /// Returns `None` for a tagged segment whose tag is unknown.
    #[must_use]
    pub fn resolve(segment: &Segment, tags: &[Tag]) -> Option<Self> {
        Some(match segment {
            Segment::All => Self::All,
            Segment::OnSale => Self::OnSale,
            Segment::Recent => Self::Recent,
            Segment::Explore => Self::Explore,
            Segment::Tagged(name) => Self::Tagged(tags.iter().find(|t| t.is_named(name))?.id),
        })
    }
}

/// The ordered matches for one query signature.
#[derive(Debug, Clone)]
pub struct MatchSet {
    pub products: Vec<Arc<Product>>,
    /// Segment size (within the category, if any) before attribute filtering.
    pub total_unfiltered: usize,
}

/// Apply the segment pre-filter.
#[must_use]
pub fn select(snapshot: &Snapshot, selection: Selection) -> Vec<Arc<Product>> {
    let products = snapshot.products.iter();
    match selection {
        Selection::All | Selection::Explore => products.cloned().collect(),
        Selection::OnSale => products.filter(|p| p.is_discounted()).cloned().collect(),
        Selection::Tagged(tag) => products.filter(|p| p.has_tag(tag)).cloned().collect(),
        Selection::Recent => {
            let mut recent: Vec<_> = products.cloned().collect();
            // Undated products sort last.
            recent.sort_by(|a, b| b.date_created.cmp(&a.date_created));
            recent
        }
    }
}

/// Keep products matching any filter pair.
///
/// Each pair selects a subset; the result is their union, deduplicated by
/// product id and kept in input order. No filters leaves the input as-is.
#[must_use]
pub fn filter_by_attributes(
    products: Vec<Arc<Product>>,
    filters: &[AttributeFilter],
) -> Vec<Arc<Product>> {
    if filters.is_empty() {
        return products;
    }

    let filters: Vec<_> = filters
        .iter()
        .map(|f| (f.attribute_id, fold_case(&f.term)))
        .collect();
    let mut seen = HashSet::new();

    products
        .into_iter()
        .filter(|product| {
            filters.iter().any(|(attribute, term)| {
                product
                    .attributes
                    .iter()
                    .filter(|a| a.id == *attribute)
                    .any(|a| a.matches_term(term))
            })
        })
        .filter(|product| seen.insert(product.id))
        .collect()
}

/// Order matches in place.
///
/// An explicit order is a stable sort by effective price. Without one,
/// explore is shuffled and every other selection keeps its order.
pub fn order<R: Rng + ?Sized>(
    products: &mut [Arc<Product>],
    selection: Selection,
    order: Option<SortOrder>,
    rng: &mut R,
) {
    match order {
        Some(SortOrder::Asc) => products.sort_by_cached_key(|p| p.effective_price()),
        Some(SortOrder::Desc) => {
            products.sort_by_cached_key(|p| std::cmp::Reverse(p.effective_price()));
        }
        None if selection == Selection::Explore => products.shuffle(rng),
        None => {}
    }
}

/// Run selection, category restriction, filtering and ordering.
#[must_use]
pub fn match_products<R: Rng + ?Sized>(
    snapshot: &Snapshot,
    selection: Selection,
    category: Option<CategoryId>,
    filters: &[AttributeFilter],
    sort: Option<SortOrder>,
    rng: &mut R,
) -> MatchSet {
    let mut selected = select(snapshot, selection);
    if let Some(category) = category {
        selected.retain(|p| p.in_category(category));
    }
    let total_unfiltered = selected.len();

    let mut products = filter_by_attributes(selected, filters);
    order(&mut products, selection, sort, rng);

    MatchSet {
        products,
        total_unfiltered,
    }
}

/// Cut page `page` (1-based) out of a match set.
///
/// Pages past the end are empty; `total_pages` is always
/// `ceil(matches / page_size)`.
#[must_use]
pub fn paginate(
    matches: &MatchSet,
    facets: Arc<Vec<Facet>>,
    page: usize,
    page_size: usize,
    now: DateTime<Utc>,
) -> QueryResult {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total_products = matches.products.len();

    let start = (page - 1).saturating_mul(page_size);
    let data = matches
        .products
        .iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();

    QueryResult {
        data,
        total_products,
        total_unfiltered: matches.total_unfiltered,
        page,
        page_size,
        total_pages: total_products.div_ceil(page_size),
        facets,
        timestamp: now,
    }
}
