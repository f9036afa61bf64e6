//! Catalog cache and query engine.
//!
//! # Architecture
//!
//! - [`cache`]: expiring key/value store with an injected clock.
//! - [`sync`]: drains the product listing into immutable snapshots.
//! - [`facets`]: attribute/term index shown alongside query results.
//! - [`query`]: pure segment/filter/sort/paginate pipeline.
//! - [`scheduler`]: periodic forced resync.
//!
//! [`Catalog`] is the facade handlers talk to. Every read is memoized in one
//! shared [`CatalogCache`] and, when recomputing fails upstream, an expired
//! entry still inside the retention window is served instead.

pub mod cache;
pub mod facets;
pub mod keys;
pub mod query;
pub mod scheduler;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use catalog_proxy_core::{
    AttributeId, CatalogQuery, Category, CategoryId, Facet, Product, ProductId, QueryError,
    QueryResult, Segment, Snapshot, Tag, VariationId,
};
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub use cache::{Clock, ManualClock, SystemClock};
pub use facets::FacetBuildError;
pub use keys::{CacheKey, CacheValue, CatalogCache, Listing, ProductDetail};
pub use query::{MatchSet, Selection};
pub use scheduler::spawn_refresh_task;
pub use sync::{SyncError, Synchronizer};

use crate::config::CacheConfig;
use crate::woocommerce::{CatalogSource, Resource, UpstreamError, decode};
use keys::FromCacheValue;

/// Tag name behind the clearance segment.
pub const CLEARANCE_TAG: &str = "clearance";

/// Errors serving catalog reads.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Facets(#[from] FacetBuildError),

    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("{0} not found")]
    NotFound(String),
}

impl CatalogError {
    /// The upstream failure behind this error, if any.
    #[must_use]
    pub const fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            Self::Upstream(err) => Some(err),
            Self::Sync(err) => Some(err.upstream()),
            Self::Facets(err) => Some(err.upstream()),
            Self::InvalidQuery(_) | Self::NotFound(_) => None,
        }
    }

    /// Whether a retained stale value may stand in for the failed read.
    ///
    /// Upstream client errors (4xx) mean the answer itself changed, so they
    /// are passed through.
    fn allows_stale(&self) -> bool {
        self.upstream()
            .is_some_and(|err| err.status().is_none_or(|status| status >= 500))
    }
}

/// Result of a cache warm-up run.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmReport {
    pub products: usize,
    pub facets: usize,
    pub tags: usize,
    pub categories: usize,
    pub queries: usize,
    pub failures: Vec<String>,
    pub elapsed_ms: u64,
}

/// Cached catalog facade.
///
/// Cheaply cloneable.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    source: Arc<dyn CatalogSource>,
    cache: CatalogCache,
    sync: Synchronizer,
    max_concurrency: usize,
    page_size: usize,
}

impl Catalog {
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>, config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let cache = CatalogCache::new(config.ttl, config.stale_retention, clock);
        let sync = Synchronizer::new(source.clone(), cache.clone(), config.max_concurrency);

        Self {
            inner: Arc::new(CatalogInner {
                source,
                cache,
                sync,
                max_concurrency: config.max_concurrency,
                page_size: config.page_size,
            }),
        }
    }

    /// The shared store.
    #[must_use]
    pub fn cache(&self) -> &CatalogCache {
        &self.inner.cache
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    /// The current snapshot, rebuilt if expired.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Sync` if a rebuild fails with no fallback.
    pub async fn snapshot(&self) -> Result<Arc<Snapshot>, CatalogError> {
        Ok(self.inner.sync.get_snapshot(false).await?)
    }

    /// Whether a valid snapshot is cached.
    pub async fn has_snapshot(&self) -> bool {
        self.inner.sync.cached().await.is_some()
    }

    /// Rebuild the snapshot unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Sync` if the rebuild fails. The previous
    /// snapshot stays cached.
    pub async fn force_resync(&self) -> Result<Arc<Snapshot>, CatalogError> {
        Ok(self.inner.sync.get_snapshot(true).await?)
    }

    /// Drop every cached entry.
    pub fn clear_all(&self) {
        self.inner.cache.clear();
        info!("Catalog cache cleared");
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Answer a catalog query.
    ///
    /// The ordered match list is cached per query signature and every page
    /// is cut from it, so explore pages stay one consistent shuffle until
    /// the entry expires.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown tag, or an upstream
    /// error if the snapshot, tags or facets cannot be loaded.
    #[instrument(skip(self, query), fields(segment = %query.segment, page = query.page))]
    pub async fn query(&self, query: &CatalogQuery) -> Result<QueryResult, CatalogError> {
        let key = CacheKey::Query(query.signature());

        let matches: Arc<MatchSet> = self
            .memoize(key, || async {
                let selection = self.resolve(&query.segment).await?;
                let snapshot = self.snapshot().await?;
                let matches = {
                    let mut rng = rand::rng();
                    query::match_products(
                        &snapshot,
                        selection,
                        query.category,
                        &query.filters,
                        query.order,
                        &mut rng,
                    )
                };
                Ok(Arc::new(matches))
            })
            .await?;

        let facets = self.facets().await?;

        Ok(query::paginate(
            &matches,
            facets,
            query.page,
            self.inner.page_size,
            self.inner.cache.now(),
        ))
    }

    async fn resolve(&self, segment: &Segment) -> Result<Selection, CatalogError> {
        let tags = match segment {
            Segment::Tagged(_) => self.tags().await?,
            _ => Arc::default(),
        };
        Selection::resolve(segment, &tags).ok_or_else(|| match segment {
            Segment::Tagged(name) => CatalogError::NotFound(format!("tag {name:?}")),
            other => CatalogError::NotFound(format!("segment {other}")),
        })
    }

    // =========================================================================
    // Taxonomy
    // =========================================================================

    /// Attribute facets, rebuilt if expired.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Facets` if the build fails with no fallback.
    pub async fn facets(&self) -> Result<Arc<Vec<Facet>>, CatalogError> {
        self.memoize(CacheKey::Facets, || async {
            let facets =
                facets::build_facets(self.inner.source.as_ref(), self.inner.max_concurrency).await?;
            Ok(Arc::new(facets))
        })
        .await
    }

    /// Every product tag.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the tag listing cannot be drained.
    pub async fn tags(&self) -> Result<Arc<Vec<Tag>>, CatalogError> {
        self.memoize(CacheKey::Tags, || async {
            let drained = self.drain(&Resource::Tags, &[]).await?;
            let tags = crate::woocommerce::decode_all(&Resource::Tags, drained.items)?;
            Ok(Arc::new(tags))
        })
        .await
    }

    /// Every product attribute.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the attribute listing cannot be drained.
    pub async fn attributes(&self) -> Result<Arc<Listing>, CatalogError> {
        self.memoize(CacheKey::Attributes, || self.listing(Resource::Attributes, Vec::new()))
            .await
    }

    /// One attribute document.
    ///
    /// # Errors
    ///
    /// Returns an upstream error, including upstream's 404 for unknown ids.
    pub async fn attribute(&self, id: AttributeId) -> Result<Arc<Value>, CatalogError> {
        self.memoize(CacheKey::Attribute(id), || self.document(Resource::Attribute(id)))
            .await
    }

    /// Top-level categories (those without a parent).
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the category listing cannot be drained.
    pub async fn categories(&self) -> Result<Arc<Listing>, CatalogError> {
        self.memoize(CacheKey::Categories, || async {
            let drained = self.drain(&Resource::Categories, &[]).await?;
            let items: Vec<Value> = drained
                .items
                .into_iter()
                .filter(|item| Category::deserialize(item).is_ok_and(|c| c.is_top_level()))
                .collect();
            Ok(Arc::new(Listing {
                total: items.len() as u64,
                items,
                fetched_at: self.inner.cache.now(),
            }))
        })
        .await
    }

    /// One category document.
    ///
    /// # Errors
    ///
    /// Returns an upstream error, including upstream's 404 for unknown ids.
    pub async fn category(&self, id: CategoryId) -> Result<Arc<Value>, CatalogError> {
        self.memoize(CacheKey::Category(id), || self.document(Resource::Category(id)))
            .await
    }

    /// Direct children of a category.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the listing cannot be drained.
    pub async fn subcategories(&self, parent: CategoryId) -> Result<Arc<Listing>, CatalogError> {
        self.memoize(CacheKey::Subcategories(parent), || {
            self.listing(
                Resource::Categories,
                vec![("parent".to_string(), parent.to_string())],
            )
        })
        .await
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// A product document plus its variations.
    ///
    /// # Errors
    ///
    /// Returns an upstream error, including upstream's 404 for unknown ids.
    pub async fn product(&self, id: ProductId) -> Result<Arc<ProductDetail>, CatalogError> {
        self.memoize(CacheKey::Product(id), || async move {
            let resource = Resource::Product(id);
            let document = self.inner.source.fetch_one(&resource).await?;
            let product: Product = decode(&resource, document)?;

            let variations = if product.variations.is_empty() {
                Vec::new()
            } else {
                self.drain(&Resource::Variations(id), &[]).await?.items
            };

            Ok(Arc::new(ProductDetail {
                product: Arc::new(product),
                variations,
                fetched_at: self.inner.cache.now(),
            }))
        })
        .await
    }

    /// Every variation of a product.
    ///
    /// # Errors
    ///
    /// Returns an upstream error, including upstream's 404 for unknown ids.
    pub async fn variations(&self, id: ProductId) -> Result<Arc<Listing>, CatalogError> {
        self.memoize(CacheKey::Variations(id), || {
            self.listing(Resource::Variations(id), Vec::new())
        })
        .await
    }

    /// One variation document.
    ///
    /// # Errors
    ///
    /// Returns an upstream error, including upstream's 404 for unknown ids.
    pub async fn variation(
        &self,
        id: ProductId,
        variation: VariationId,
    ) -> Result<Arc<Value>, CatalogError> {
        self.memoize(CacheKey::Variation(id, variation), || {
            self.document(Resource::Variation(id, variation))
        })
        .await
    }

    // =========================================================================
    // Warm-up
    // =========================================================================

    /// Populate the cache ahead of traffic.
    ///
    /// Loads the snapshot, facets, tags, every category with its children
    /// and products, and page 1 of every segment. Best effort: each failure
    /// is logged and recorded and the run continues.
    #[instrument(skip(self))]
    pub async fn warm(&self) -> WarmReport {
        let started = Instant::now();
        let mut report = WarmReport::default();

        match self.snapshot().await {
            Ok(snapshot) => report.products = snapshot.len(),
            Err(e) => record_failure(&mut report, "snapshot", &e),
        }
        match self.facets().await {
            Ok(facets) => report.facets = facets.len(),
            Err(e) => record_failure(&mut report, "facets", &e),
        }
        match self.tags().await {
            Ok(tags) => report.tags = tags.len(),
            Err(e) => record_failure(&mut report, "tags", &e),
        }

        match self.categories().await {
            Ok(categories) => {
                report.categories = categories.items.len();
                let ids: Vec<CategoryId> = categories
                    .items
                    .iter()
                    .filter_map(|item| Category::deserialize(item).ok())
                    .map(|c| c.id)
                    .collect();

                let outcomes: Vec<(bool, Vec<String>)> = stream::iter(ids)
                    .map(|id| async move {
                        let mut failed = Vec::new();
                        if let Err(e) = self.category(id).await {
                            failed.push(format!("category {id}: {e}"));
                        }
                        if let Err(e) = self.subcategories(id).await {
                            failed.push(format!("subcategories {id}: {e}"));
                        }
                        let products = CatalogQuery {
                            category: Some(id),
                            ..CatalogQuery::segment(Segment::All)
                        };
                        let queried = match self.query(&products).await {
                            Ok(_) => true,
                            Err(e) => {
                                failed.push(format!("products in category {id}: {e}"));
                                false
                            }
                        };
                        (queried, failed)
                    })
                    .buffer_unordered(self.inner.max_concurrency.max(1))
                    .collect()
                    .await;
                for (queried, failures) in outcomes {
                    report.queries += usize::from(queried);
                    for failure in failures {
                        warn!(failure = %failure, "Cache warm-up step failed");
                        report.failures.push(failure);
                    }
                }
            }
            Err(e) => record_failure(&mut report, "categories", &e),
        }

        for segment in [
            Segment::All,
            Segment::OnSale,
            Segment::Recent,
            Segment::Tagged(CLEARANCE_TAG.to_string()),
            Segment::Explore,
        ] {
            let label = segment.to_string();
            match self.query(&CatalogQuery::segment(segment)).await {
                Ok(_) => report.queries += 1,
                Err(e) => record_failure(&mut report, &label, &e),
            }
        }

        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            products = report.products,
            facets = report.facets,
            tags = report.tags,
            categories = report.categories,
            queries = report.queries,
            failures = report.failures.len(),
            elapsed_ms = report.elapsed_ms,
            "Cache warm-up complete"
        );
        report
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Return the cached value for `key`, or compute and cache it.
    ///
    /// If computing fails upstream with a server-side error and an expired
    /// entry is still retained, the expired value is served.
    async fn memoize<T, F, Fut>(&self, key: CacheKey, load: F) -> Result<T, CatalogError>
    where
        T: FromCacheValue + Into<CacheValue> + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        let cache = &self.inner.cache;
        if let Some(value) = cache.get(&key).await.and_then(T::from_cache_value) {
            return Ok(value);
        }

        match load().await {
            Ok(value) => {
                cache.put(key, value.clone().into()).await;
                Ok(value)
            }
            Err(err) if err.allows_stale() => {
                let stale = cache
                    .get_stale(&key)
                    .await
                    .and_then(|entry| T::from_cache_value(entry.value));
                match stale {
                    Some(value) => {
                        warn!(key = ?key, error = %err, "Serving stale cache entry");
                        Ok(value)
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn drain(
        &self,
        resource: &Resource,
        params: &[(String, String)],
    ) -> Result<sync::Drained, UpstreamError> {
        sync::drain(
            self.inner.source.as_ref(),
            resource,
            params,
            self.inner.max_concurrency,
        )
        .await
    }

    async fn listing(
        &self,
        resource: Resource,
        params: Vec<(String, String)>,
    ) -> Result<Arc<Listing>, CatalogError> {
        let drained = self.drain(&resource, &params).await?;
        Ok(Arc::new(Listing {
            items: drained.items,
            total: drained.total,
            fetched_at: self.inner.cache.now(),
        }))
    }

    async fn document(&self, resource: Resource) -> Result<Arc<Value>, CatalogError> {
        Ok(Arc::new(self.inner.source.fetch_one(&resource).await?))
    }
}

fn record_failure(report: &mut WarmReport, step: &str, err: &CatalogError) {
    warn!(step, error = %err, "Cache warm-up step failed");
    report.failures.push(format!("{step}: {err}"));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::catalog::testing::{FakeSource, products, start};
    use catalog_proxy_core::{AttributeFilter, SortOrder};
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        source: Arc<FakeSource>,
        clock: Arc<ManualClock>,
        catalog: Catalog,
    }

    fn fixture(source: FakeSource) -> Fixture {
        let source = Arc::new(source);
        let clock = Arc::new(ManualClock::new(start()));
        let catalog = Catalog::new(source.clone(), &CacheConfig::default(), clock.clone());
        Fixture {
            source,
            clock,
            catalog,
        }
    }

    fn store() -> FakeSource {
        FakeSource::new()
            .with_listing(
                Resource::Products,
                vec![
                    json!({"id": 1, "price": "30", "attributes": [{"id": 1, "options": ["red"]}],
                           "tags": [{"id": 5, "name": "Clearance", "slug": "clearance"}]}),
                    json!({"id": 2, "price": "10", "attributes": [{"id": 1, "options": ["blue"]}]}),
                    json!({"id": 3, "price": "20", "attributes": [{"id": 2, "options": ["red"]}],
                           "variations": [31, 32]}),
                ],
            )
            .with_listing(
                Resource::Tags,
                vec![json!({"id": 5, "name": "Clearance", "slug": "clearance", "count": 1})],
            )
            .with_listing(
                Resource::Attributes,
                vec![json!({"id": 1, "name": "Color", "slug": "pa_color"})],
            )
            .with_listing(
                Resource::AttributeTerms(AttributeId::new(1)),
                vec![json!({"id": 10, "name": "Red", "slug": "red"})],
            )
            .with_listing(
                Resource::Categories,
                vec![
                    json!({"id": 7, "name": "Shirts", "parent": 0}),
                    json!({"id": 8, "name": "Polos", "parent": 7}),
                ],
            )
            .with_document(
                Resource::Product(ProductId::new(3)),
                json!({"id": 3, "name": "Tee", "variations": [31, 32]}),
            )
            .with_document(Resource::Product(ProductId::new(2)), json!({"id": 2}))
            .with_listing(
                Resource::Variations(ProductId::new(3)),
                vec![json!({"id": 31}), json!({"id": 32})],
            )
    }

    fn ids(result: &QueryResult) -> Vec<u64> {
        result.data.iter().map(|p| p.id.as_u64()).collect()
    }

    #[tokio::test]
    async fn test_query_filters_sorts_and_attaches_facets() {
        let fx = fixture(store());
        let query = CatalogQuery {
            filters: vec![
                AttributeFilter::new(AttributeId::new(1), "red"),
                AttributeFilter::new(AttributeId::new(2), "red"),
            ],
            order: Some(SortOrder::Asc),
            ..CatalogQuery::segment(Segment::All)
        };

        let result = fx.catalog.query(&query).await.unwrap();

        assert_eq!(ids(&result), vec![3, 1]);
        assert_eq!(result.total_products, 2);
        assert_eq!(result.total_unfiltered, 3);
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.facets.len(), 1);
        assert_eq!(result.facets[0].name, "color");
    }

    #[tokio::test]
    async fn test_clearance_resolves_tag_and_unknown_tag_is_not_found() {
        let fx = fixture(store());

        let clearance = fx
            .catalog
            .query(&CatalogQuery::segment(Segment::Tagged(CLEARANCE_TAG.to_string())))
            .await
            .unwrap();
        assert_eq!(ids(&clearance), vec![1]);

        let err = fx
            .catalog
            .query(&CatalogQuery::segment(Segment::Tagged("missing".to_string())))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_explore_pages_share_one_shuffle() {
        let fx = fixture(FakeSource::new().with_listing(Resource::Products, products(30)));
        let mut seen = Vec::new();

        for page in 1..=3 {
            let query = CatalogQuery {
                page,
                ..CatalogQuery::segment(Segment::Explore)
            };
            seen.extend(ids(&fx.catalog.query(&query).await.unwrap()));
        }

        seen.sort_unstable();
        assert_eq!(seen, (1..=30).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_query_entries_are_isolated_per_signature() {
        let fx = fixture(store());
        let plain = CatalogQuery::segment(Segment::All);
        let desc = CatalogQuery {
            order: Some(SortOrder::Desc),
            ..CatalogQuery::segment(Segment::All)
        };
        fx.catalog.query(&plain).await.unwrap();
        fx.catalog.query(&desc).await.unwrap();

        let cache = fx.catalog.cache();
        cache.invalidate(&CacheKey::Query(plain.signature())).await;
        assert!(cache.get(&CacheKey::Query(plain.signature())).await.is_none());
        assert!(cache.get(&CacheKey::Query(desc.signature())).await.is_some());

        fx.catalog.clear_all();
        assert!(cache.get(&CacheKey::Query(desc.signature())).await.is_none());
        assert!(!fx.catalog.has_snapshot().await);
    }

    #[tokio::test]
    async fn test_facets_fall_back_to_stale_on_server_error() {
        let fx = fixture(store());
        let built = fx.catalog.facets().await.unwrap();

        fx.clock.advance(Duration::from_secs(301));
        fx.source.fail_page(&Resource::Attributes, 1, 500);
        let served = fx.catalog.facets().await.unwrap();

        assert!(Arc::ptr_eq(&built, &served));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_masked_by_stale_entries() {
        let fx = fixture(store());
        fx.catalog.product(ProductId::new(2)).await.unwrap();

        fx.clock.advance(Duration::from_secs(301));
        fx.source.fail_document(&Resource::Product(ProductId::new(2)), 404);
        let err = fx.catalog.product(ProductId::new(2)).await.unwrap_err();

        assert_eq!(err.upstream().and_then(UpstreamError::status), Some(404));
    }

    #[tokio::test]
    async fn test_product_includes_variations_only_when_present() {
        let fx = fixture(store());

        let variable = fx.catalog.product(ProductId::new(3)).await.unwrap();
        assert_eq!(variable.variations.len(), 2);

        let simple = fx.catalog.product(ProductId::new(2)).await.unwrap();
        assert!(simple.variations.is_empty());
        assert_eq!(fx.source.calls_for(&Resource::Variations(ProductId::new(2))), 0);

        fx.catalog.product(ProductId::new(3)).await.unwrap();
        assert_eq!(fx.source.calls_for(&Resource::Product(ProductId::new(3))), 1);
    }

    #[tokio::test]
    async fn test_categories_keep_only_top_level() {
        let fx = fixture(store());

        let categories = fx.catalog.categories().await.unwrap();

        assert_eq!(categories.total, 1);
        assert_eq!(categories.items[0]["id"], 7);
    }

    #[tokio::test]
    async fn test_force_resync_replaces_snapshot() {
        let fx = fixture(store());
        let before = fx.catalog.snapshot().await.unwrap();

        fx.source.set_listing(&Resource::Products, products(4));
        let after = fx.catalog.force_resync().await.unwrap();

        assert_eq!(before.len(), 3);
        assert_eq!(after.len(), 4);
        assert!(fx.catalog.has_snapshot().await);
    }

    #[tokio::test]
    async fn test_warm_populates_cache_and_records_failures() {
        let fx = fixture(store());
        fx.source.fail_page(&Resource::Tags, 1, 500);

        let report = fx.catalog.warm().await;

        assert_eq!(report.products, 3);
        assert_eq!(report.facets, 1);
        assert_eq!(report.categories, 1);
        // Category 7 plus every segment but clearance, which needs tags.
        assert_eq!(report.queries, 5);
        assert!(report.failures.iter().any(|f| f.starts_with("category 7")));
        assert!(report.failures.iter().any(|f| f.starts_with("tags")));
        assert!(fx.catalog.has_snapshot().await);
    }

    #[tokio::test]
    async fn test_catalog_futures_run_on_spawned_tasks() {
        let fx = fixture(store());

        let catalog = fx.catalog.clone();
        let query = tokio::spawn(async move {
            catalog.query(&CatalogQuery::segment(Segment::OnSale)).await
        });
        let catalog = fx.catalog.clone();
        let facets = tokio::spawn(async move { catalog.facets().await });
        let catalog = fx.catalog.clone();
        let warm = tokio::spawn(async move { catalog.warm().await });

        assert!(query.await.unwrap().is_ok());
        assert_eq!(facets.await.unwrap().unwrap().len(), 1);
        assert_eq!(warm.await.unwrap().products, 3);
    }

    #[tokio::test]
    async fn test_terms_containing_separators_do_not_share_cache_entries() {
        let fx = fixture(FakeSource::new().with_listing(
            Resource::Products,
            vec![
                json!({"id": 1, "attributes": [{"id": 1, "options": ["a"]}, {"id": 2, "options": ["b"]}]}),
                json!({"id": 2, "attributes": [{"id": 1, "options": ["a&2=b"]}]}),
            ],
        ));
        let split = CatalogQuery {
            filters: vec![
                AttributeFilter::new(AttributeId::new(1), "a"),
                AttributeFilter::new(AttributeId::new(2), "b"),
            ],
            ..CatalogQuery::segment(Segment::All)
        };
        let joined = CatalogQuery {
            filters: vec![AttributeFilter::new(AttributeId::new(1), "a&2=b")],
            ..CatalogQuery::segment(Segment::All)
        };

        let split_result = fx.catalog.query(&split).await.unwrap();
        let joined_result = fx.catalog.query(&joined).await.unwrap();

        assert_eq!(ids(&split_result), vec![1]);
        assert_eq!(ids(&joined_result), vec![2]);
    }

    #[tokio::test]
    async fn test_category_query_restricts_to_embedded_categories() {
        let fx = fixture(FakeSource::new().with_listing(
            Resource::Products,
            vec![
                json!({"id": 1, "price": "9", "categories": [{"id": 7, "name": "Shirts", "slug": "shirts"}]}),
                json!({"id": 2, "price": "3", "categories": [{"id": 9, "name": "Hats", "slug": "hats"}]}),
                json!({"id": 3, "price": "5", "categories": [{"id": 7, "name": "Shirts", "slug": "shirts"}]}),
            ],
        ));
        let shirts = CatalogQuery {
            category: Some(CategoryId::new(7)),
            order: Some(SortOrder::Asc),
            ..CatalogQuery::segment(Segment::All)
        };

        let result = fx.catalog.query(&shirts).await.unwrap();

        assert_eq!(ids(&result), vec![3, 1]);
        assert_eq!(result.total_unfiltered, 2);
        let everything = fx.catalog.query(&CatalogQuery::segment(Segment::All)).await.unwrap();
        assert_eq!(everything.total_products, 3);
    }

    #[tokio::test]
    async fn test_variations_listing_and_document_are_memoized() {
        let source = store().with_document(
            Resource::Variation(ProductId::new(3), VariationId::new(31)),
            json!({"id": 31, "sku": "TEE-S"}),
        );
        let fx = fixture(source);

        let listing = fx.catalog.variations(ProductId::new(3)).await.unwrap();
        assert_eq!(listing.total, 2);
        assert_eq!(listing.items[1]["id"], 32);

        let variation = fx
            .catalog
            .variation(ProductId::new(3), VariationId::new(31))
            .await
            .unwrap();
        assert_eq!(variation["sku"], "TEE-S");

        fx.catalog.variations(ProductId::new(3)).await.unwrap();
        fx.catalog
            .variation(ProductId::new(3), VariationId::new(31))
            .await
            .unwrap();
        assert_eq!(fx.source.calls_for(&Resource::Variations(ProductId::new(3))), 1);
        let variation = Resource::Variation(ProductId::new(3), VariationId::new(31));
        assert_eq!(fx.source.calls_for(&variation), 1);
    }

    #[tokio::test]
    async fn test_unknown_variation_forwards_upstream_not_found() {
        let fx = fixture(store());

        let err = fx
            .catalog
            .variation(ProductId::new(3), VariationId::new(99))
            .await
            .unwrap_err();

        assert_eq!(err.upstream().and_then(UpstreamError::status), Some(404));
    }
}
