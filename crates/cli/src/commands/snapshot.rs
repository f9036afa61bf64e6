//! Offline snapshot check.
//!
//! Runs one full product drain and one facet build directly against
//! WooCommerce, using the same configuration as the server, and logs what
//! came back. Nothing is served.
//!
//! # Usage
//!
//! ```bash
//! catalog-cli snapshot
//! ```

use std::sync::Arc;
use std::time::Instant;

use catalog_proxy_server::catalog::{Catalog, SystemClock};
use catalog_proxy_server::config::ServerConfig;
use catalog_proxy_server::woocommerce::WooClient;

/// Build a snapshot and the facet index once.
///
/// # Errors
///
/// Returns an error if configuration is invalid or either build fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    tracing::info!(store = %config.woocommerce.base_url, "Building snapshot");

    let source = WooClient::new(&config.woocommerce)?;
    let catalog = Catalog::new(Arc::new(source), &config.cache, Arc::new(SystemClock));

    let started = Instant::now();
    let snapshot = catalog.force_resync().await?;
    tracing::info!(
        products = snapshot.len(),
        total = snapshot.total,
        duplicates = snapshot.duplicate_count(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Snapshot complete"
    );

    let started = Instant::now();
    let facets = catalog.facets().await?;
    tracing::info!(
        attributes = facets.len(),
        terms = facets.iter().map(|f| f.terms.len()).sum::<usize>(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Facets complete"
    );

    for facet in facets.iter() {
        tracing::info!(id = %facet.id, name = %facet.name, terms = facet.terms.len(), "Facet");
    }

    Ok(())
}
