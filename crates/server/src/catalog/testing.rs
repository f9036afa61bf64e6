//! In-memory [`CatalogSource`] for unit tests.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::woocommerce::{CatalogSource, MAX_PAGE_SIZE, Page, Resource, UpstreamError};

/// Fixed test epoch.
pub fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// `count` minimal product documents with ids `1..=count`.
pub fn products(count: u64) -> Vec<Value> {
    (1..=count)
        .map(|id| json!({"id": id, "name": format!("Product {id}"), "price": format!("{id}.00")}))
        .collect()
}

/// Serves fixed listings and documents, records every call and can be told
/// to fail individual pages.
#[derive(Debug, Default)]
pub struct FakeSource {
    listings: Mutex<HashMap<String, Vec<Value>>>,
    documents: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<(String, u32), u16>>,
    calls: Mutex<Vec<(String, u32)>>,
    delay: Option<Duration>,
    omit_total: bool,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(self, resource: Resource, items: Vec<Value>) -> Self {
        self.set_listing(&resource, items);
        self
    }

    pub fn with_document(self, resource: Resource, document: Value) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(resource.path(), document);
        self
    }

    /// Answer listings without a total, like a store behind a proxy that
    /// strips the header.
    pub const fn without_total(mut self) -> Self {
        self.omit_total = true;
        self
    }

    /// Sleep this long inside every call.
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_listing(&self, resource: &Resource, items: Vec<Value>) {
        self.listings.lock().unwrap().insert(resource.path(), items);
    }

    /// Make `page` of `resource` answer with `status`.
    pub fn fail_page(&self, resource: &Resource, page: u32, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .insert((resource.path(), page), status);
    }

    /// Make a single-document read answer with `status`.
    pub fn fail_document(&self, resource: &Resource, status: u16) {
        self.fail_page(resource, 0, status);
    }

    /// Page numbers requested for a listing, in call order.
    pub fn pages_fetched(&self, resource: &Resource) -> Vec<u32> {
        let path = resource.path();
        let mut pages: Vec<u32> = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, page)| *p == path && *page > 0)
            .map(|(_, page)| *page)
            .collect();
        pages.sort_unstable();
        pages
    }

    /// Number of page-1 or single-document requests across all resources.
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, page)| *page <= 1)
            .count()
    }

    /// Number of requests of any kind for one resource.
    pub fn calls_for(&self, resource: &Resource) -> usize {
        let path = resource.path();
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == path)
            .count()
    }

    fn record(&self, resource: &Resource, page: u32) -> Option<u16> {
        self.calls.lock().unwrap().push((resource.path(), page));
        self.failures
            .lock()
            .unwrap()
            .get(&(resource.path(), page))
            .copied()
    }

    fn status_error(resource: &Resource, status: u16) -> UpstreamError {
        UpstreamError::Status {
            resource: resource.path(),
            status,
            body: json!({"code": "fake_failure", "data": {"status": status}}).to_string(),
        }
    }
}

#[async_trait]
impl CatalogSource for FakeSource {
    async fn fetch_page(
        &self,
        resource: &Resource,
        _params: &[(String, String)],
        page: u32,
        per_page: u32,
    ) -> Result<Page<Value>, UpstreamError> {
        let failure = self.record(resource, page);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = failure {
            return Err(Self::status_error(resource, status));
        }

        let listing = self
            .listings
            .lock()
            .unwrap()
            .get(&resource.path())
            .cloned()
            .unwrap_or_default();
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE) as usize;
        let start = (page.max(1) as usize - 1) * per_page;

        Ok(Page {
            total: (!self.omit_total).then_some(listing.len() as u64),
            items: listing.into_iter().skip(start).take(per_page).collect(),
        })
    }

    async fn fetch_one(&self, resource: &Resource) -> Result<Value, UpstreamError> {
        let failure = self.record(resource, 0);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = failure {
            return Err(Self::status_error(resource, status));
        }

        self.documents
            .lock()
            .unwrap()
            .get(&resource.path())
            .cloned()
            .ok_or_else(|| Self::status_error(resource, 404))
    }
}
