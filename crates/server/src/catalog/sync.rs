//! Full-snapshot synchronization.
//!
//! A rebuild drains the whole products listing: page 1 first to learn the
//! total, then every remaining page concurrently. Pages are merged in page
//! order and any failure abandons the rebuild, so the cache only ever holds
//! complete snapshots.

use std::sync::Arc;
use std::time::Instant;

use catalog_proxy_core::{Product, Snapshot};
use futures::{StreamExt, TryStreamExt, stream};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::keys::{CacheKey, CacheValue, CatalogCache, FromCacheValue};
use crate::woocommerce::{CatalogSource, MAX_PAGE_SIZE, Page, Resource, UpstreamError, total_pages};

/// Errors rebuilding the product snapshot.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("snapshot rebuild failed: {0}")]
    Upstream(#[from] UpstreamError),
}

impl SyncError {
    #[must_use]
    pub const fn upstream(&self) -> &UpstreamError {
        match self {
            Self::Upstream(err) => err,
        }
    }
}

/// Every item of a listing.
#[derive(Debug)]
pub(crate) struct Drained {
    pub items: Vec<Value>,
    /// Total upstream reported on page 1.
    pub total: u64,
    pub pages: u32,
}

/// Fetch every page of a listing.
///
/// Pages after the first run at most `max_concurrency` at a time and are
/// merged in page order. Without a total on page 1 the listing is walked
/// page by page until a short page.
pub(crate) async fn drain(
    source: &dyn CatalogSource,
    resource: &Resource,
    params: &[(String, String)],
    max_concurrency: usize,
) -> Result<Drained, UpstreamError> {
    let first = source.fetch_page(resource, params, 1, MAX_PAGE_SIZE).await?;
    let Some(total) = first.total else {
        warn!(resource = %resource, "Listing has no total; paging until a short page");
        return drain_sequential(source, resource, params, first.items).await;
    };
    let pages = total_pages(total, MAX_PAGE_SIZE).max(1);

    let rest: Vec<Page<Value>> = stream::iter(2..=pages)
        .map(|page| source.fetch_page(resource, params, page, MAX_PAGE_SIZE))
        .buffered(max_concurrency.max(1))
        .try_collect()
        .await?;

    let mut items = first.items;
    for page in rest {
        items.extend(page.items);
    }

    Ok(Drained {
        items,
        total,
        pages,
    })
}

async fn drain_sequential(
    source: &dyn CatalogSource,
    resource: &Resource,
    params: &[(String, String)],
    mut items: Vec<Value>,
) -> Result<Drained, UpstreamError> {
    let per_page = MAX_PAGE_SIZE as usize;
    let mut pages = 1;
    let mut last_len = items.len();

    while last_len >= per_page {
        pages += 1;
        let page = source.fetch_page(resource, params, pages, MAX_PAGE_SIZE).await?;
        last_len = page.items.len();
        items.extend(page.items);
    }

    Ok(Drained {
        total: items.len() as u64,
        items,
        pages,
    })
}

/// Keeps the `AllProducts` cache entry populated.
pub struct Synchronizer {
    source: Arc<dyn CatalogSource>,
    cache: CatalogCache,
    max_concurrency: usize,
    rebuild_lock: Mutex<()>,
}

impl Synchronizer {
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>, cache: CatalogCache, max_concurrency: usize) -> Self {
        Self {
            source,
            cache,
            max_concurrency,
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Drain upstream and publish a new snapshot.
    ///
    /// On failure the existing cache entry is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if any page fetch fails.
    #[instrument(skip(self))]
    pub async fn rebuild_snapshot(&self) -> Result<Arc<Snapshot>, SyncError> {
        let started = Instant::now();

        let drained = drain(
            self.source.as_ref(),
            &Resource::Products,
            &[],
            self.max_concurrency,
        )
        .await
        .inspect_err(|e| error!(error = %e, "Snapshot rebuild failed"))?;

        let products = decode_products(drained.items);
        let snapshot = Arc::new(Snapshot::new(products, drained.total, self.cache.now()));

        let duplicates = snapshot.duplicate_count();
        if duplicates > 0 {
            warn!(duplicates, "Snapshot contains repeated product ids");
        }
        if snapshot.len() as u64 != snapshot.total {
            warn!(
                total = snapshot.total,
                fetched = snapshot.len(),
                "Snapshot size differs from upstream total"
            );
        }

        self.cache
            .put(CacheKey::AllProducts, CacheValue::from(snapshot.clone()))
            .await;

        info!(
            total = snapshot.total,
            products = snapshot.len(),
            pages = drained.pages,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Snapshot rebuilt"
        );

        Ok(snapshot)
    }

    /// Get the current snapshot, rebuilding when absent, expired or forced.
    ///
    /// Concurrent rebuilds are serialized and a non-forced caller re-checks
    /// the cache once it holds the lock. A failed non-forced rebuild serves
    /// the expired snapshot if one is still retained.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` when the rebuild fails and no fallback applies.
    pub async fn get_snapshot(&self, force_refresh: bool) -> Result<Arc<Snapshot>, SyncError> {
        if !force_refresh && let Some(snapshot) = self.cached().await {
            return Ok(snapshot);
        }

        let _guard = self.rebuild_lock.lock().await;

        if !force_refresh && let Some(snapshot) = self.cached().await {
            debug!("Snapshot rebuilt while waiting for lock");
            return Ok(snapshot);
        }

        match self.rebuild_snapshot().await {
            Ok(snapshot) => Ok(snapshot),
            Err(err) if !force_refresh => match self.stale().await {
                Some(snapshot) => {
                    warn!(
                        error = %err,
                        created_at = %snapshot.created_at,
                        "Serving stale snapshot"
                    );
                    Ok(snapshot)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// The cached snapshot if it is still valid.
    pub async fn cached(&self) -> Option<Arc<Snapshot>> {
        self.cache
            .get(&CacheKey::AllProducts)
            .await
            .and_then(FromCacheValue::from_cache_value)
    }

    async fn stale(&self) -> Option<Arc<Snapshot>> {
        self.cache
            .get_stale(&CacheKey::AllProducts)
            .await
            .and_then(|entry| FromCacheValue::from_cache_value(entry.value))
    }
}

/// Decode listing items, skipping any that are not products.
fn decode_products(items: Vec<Value>) -> Vec<Product> {
    items
        .into_iter()
        .filter_map(|item| {
            let id = item.get("id").cloned();
            serde_json::from_value::<Product>(item)
                .inspect_err(|e| warn!(id = ?id, error = %e, "Skipping undecodable product"))
                .ok()
        })
        .collect()
}
