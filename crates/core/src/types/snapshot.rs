//! Point-in-time catalog snapshots.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::product::Product;

/// A complete, immutable copy of the catalog.
///
/// Products are individually `Arc`-shared so query results can reference
/// them without cloning upstream documents.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub products: Vec<Arc<Product>>,
    /// Item count upstream reported when the drain started.
    pub total: u64,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    #[must_use]
    pub fn new(products: Vec<Product>, total: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            products: products.into_iter().map(Arc::new).collect(),
            total,
            created_at,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Number of product ids that occur more than once.
    ///
    /// Upstream is live, so a product can move between pages mid-drain.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.products.len());
        self.products.iter().filter(|p| !seen.insert(p.id)).count()
    }
}
