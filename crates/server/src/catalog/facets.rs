//! Attribute and term index.

use std::time::Instant;

use catalog_proxy_core::{Attribute, AttributeId, AttributeTerm, Facet};
use futures::{StreamExt, TryStreamExt, stream};
use thiserror::Error;
use tracing::{error, info, instrument};

use super::sync::drain;
use crate::woocommerce::{CatalogSource, Resource, UpstreamError, decode_all};

/// Errors building the facet list.
#[derive(Debug, Error)]
pub enum FacetBuildError {
    #[error("failed to fetch attributes: {0}")]
    Attributes(#[source] UpstreamError),

    #[error("failed to fetch terms for attribute {attribute_id}: {source}")]
    Terms {
        attribute_id: AttributeId,
        #[source]
        source: UpstreamError,
    },
}

impl FacetBuildError {
    /// The upstream failure behind the build error.
    #[must_use]
    pub const fn upstream(&self) -> &UpstreamError {
        match self {
            Self::Attributes(source) | Self::Terms { source, .. } => source,
        }
    }
}

/// Fetch every attribute and its terms.
///
/// Term listings are drained concurrently, at most `max_concurrency` at a
/// time, and facets keep the attribute listing's order. An attribute with no
/// terms yields a facet with an empty term list.
///
/// # Errors
///
/// Fails as a whole if the attribute listing or any term listing fails.
#[instrument(skip(source))]
pub async fn build_facets(
    source: &dyn CatalogSource,
    max_concurrency: usize,
) -> Result<Vec<Facet>, FacetBuildError> {
    let started = Instant::now();

    let attributes: Vec<Attribute> = drain(source, &Resource::Attributes, &[], max_concurrency)
        .await
        .and_then(|drained| decode_all(&Resource::Attributes, drained.items))
        .map_err(FacetBuildError::Attributes)?;

    let facets: Vec<Facet> = stream::iter(attributes)
        .map(|attribute| async move {
            let resource = Resource::AttributeTerms(attribute.id);
            let terms: Vec<AttributeTerm> = drain(source, &resource, &[], max_concurrency)
                .await
                .and_then(|drained| decode_all(&resource, drained.items))
                .map_err(|source| FacetBuildError::Terms {
                    attribute_id: attribute.id,
                    source,
                })?;
            Ok::<_, FacetBuildError>(Facet::from_attribute(&attribute, &terms))
        })
        .buffered(max_concurrency.max(1))
        .try_collect()
        .await
        .inspect_err(|e| error!(error = %e, "Facet build failed"))?;

    info!(
        attributes = facets.len(),
        terms = facets.iter().map(|f| f.terms.len()).sum::<usize>(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Facets built"
    );

    Ok(facets)
}
