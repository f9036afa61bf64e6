//! `reqwest`-backed WooCommerce REST client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{CatalogSource, MAX_PAGE_SIZE, Page, Resource, TOTAL_HEADER, UpstreamError};
use crate::config::WooCommerceConfig;

/// Maximum number of body characters written to logs.
const LOG_BODY_CHARS: usize = 500;

/// Client for the WooCommerce REST API.
///
/// Authenticates every request with the consumer key/secret over HTTP basic
/// auth. Cheaply cloneable.
#[derive(Clone)]
pub struct WooClient {
    inner: Arc<WooClientInner>,
}

struct WooClientInner {
    client: reqwest::Client,
    api_root: String,
    consumer_key: String,
    consumer_secret: SecretString,
}

impl WooClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &WooCommerceConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("catalog-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(WooClientInner {
                client,
                api_root: config.api_root(),
                consumer_key: config.consumer_key.clone(),
                consumer_secret: config.consumer_secret.clone(),
            }),
        })
    }

    /// Issue a GET and return the response headers and JSON body.
    async fn get(
        &self,
        resource: &Resource,
        query: &[(String, String)],
    ) -> Result<(HeaderMap, Value), UpstreamError> {
        let url = format!("{}{}", self.inner.api_root, resource.path());

        let response = self
            .inner
            .client
            .get(&url)
            .basic_auth(
                &self.inner.consumer_key,
                Some(self.inner.consumer_secret.expose_secret()),
            )
            .query(query)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                resource: resource.path(),
                source,
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|source| UpstreamError::Transport {
                resource: resource.path(),
                source,
            })?;

        if !status.is_success() {
            tracing::error!(
                resource = %resource,
                status = %status,
                body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "WooCommerce API returned non-success status"
            );
            return Err(UpstreamError::Status {
                resource: resource.path(),
                status: status.as_u16(),
                body,
            });
        }

        let value = serde_json::from_str(&body).map_err(|source| {
            tracing::error!(
                resource = %resource,
                error = %source,
                body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Failed to parse WooCommerce response"
            );
            UpstreamError::Decode {
                resource: resource.path(),
                source,
            }
        })?;

        Ok((headers, value))
    }
}

/// Read the listing total from response headers.
fn header_total(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(TOTAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

#[async_trait]
impl CatalogSource for WooClient {
    #[instrument(skip(self, params), fields(resource = %resource))]
    async fn fetch_page(
        &self,
        resource: &Resource,
        params: &[(String, String)],
        page: u32,
        per_page: u32,
    ) -> Result<Page<Value>, UpstreamError> {
        let mut query = params.to_vec();
        query.push(("page".to_string(), page.max(1).to_string()));
        query.push((
            "per_page".to_string(),
            per_page.clamp(1, MAX_PAGE_SIZE).to_string(),
        ));

        let (headers, value) = self.get(resource, &query).await?;

        let Value::Array(items) = value else {
            return Err(UpstreamError::UnexpectedShape {
                resource: resource.path(),
                expected: "a JSON array",
            });
        };

        let total = header_total(&headers);
        debug!(page, count = items.len(), total = ?total, "Fetched listing page");

        Ok(Page { items, total })
    }

    #[instrument(skip(self), fields(resource = %resource))]
    async fn fetch_one(&self, resource: &Resource) -> Result<Value, UpstreamError> {
        let (_, value) = self.get(resource, &[]).await?;
        Ok(value)
    }
}
