//! End-to-end test support for the catalog proxy.
//!
//! Tests run the real router in-process with `tower::ServiceExt::oneshot`
//! against a `wiremock` server that speaks the slice of the WooCommerce REST
//! API the proxy uses.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p catalog-proxy-integration-tests
//! ```

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use catalog_proxy_server::catalog::{Catalog, SystemClock};
use catalog_proxy_server::config::{CacheConfig, WooCommerceConfig};
use catalog_proxy_server::state::AppState;
use catalog_proxy_server::woocommerce::{MAX_PAGE_SIZE, WooClient};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CONSUMER_KEY: &str = "ck_integration";
pub const CONSUMER_SECRET: &str = "cs_4f1d0b7e2a";

/// A mock WooCommerce store.
pub struct MockStore {
    pub server: MockServer,
}

impl MockStore {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Client configuration pointing at the mock.
    #[must_use]
    pub fn config(&self) -> WooCommerceConfig {
        let base_url = Url::parse(&self.server.uri()).expect("mock server URI is a valid URL");
        WooCommerceConfig::new(base_url, CONSUMER_KEY, SecretString::from(CONSUMER_SECRET))
    }

    fn api_path(resource: &str) -> String {
        format!("/wp-json/wc/v3/{resource}")
    }

    /// Serve `items` as a paginated listing with an `X-WP-Total` header.
    ///
    /// Each page only answers authenticated requests for exactly that page.
    pub async fn listing(&self, resource: &str, items: &[Value]) {
        self.paged(resource, items, true).await;
    }

    /// Serve `items` paginated but without the `X-WP-Total` header, plus an
    /// empty page past the end.
    pub async fn listing_without_total(&self, resource: &str, items: &[Value]) {
        self.paged(resource, items, false).await;
    }

    async fn paged(&self, resource: &str, items: &[Value], with_total: bool) {
        let per_page = MAX_PAGE_SIZE as usize;
        let total = items.len();
        let pages = if with_total {
            total.div_ceil(per_page).max(1)
        } else {
            total / per_page + 1
        };

        for page in 1..=pages {
            let chunk: Vec<&Value> = items.iter().skip((page - 1) * per_page).take(per_page).collect();
            Mock::given(method("GET"))
                .and(path(Self::api_path(resource)))
                .and(query_param("page", page.to_string()))
                .and(query_param("per_page", per_page.to_string()))
                .and(basic_auth(CONSUMER_KEY, CONSUMER_SECRET))
                .respond_with(if with_total {
                    ResponseTemplate::new(200)
                        .insert_header("X-WP-Total", total.to_string().as_str())
                        .set_body_json(chunk)
                } else {
                    ResponseTemplate::new(200).set_body_json(chunk)
                })
                .mount(&self.server)
                .await;
        }
    }

    /// Serve a listing that only answers when `key=value` is in the query.
    pub async fn filtered_listing(&self, resource: &str, key: &str, value: &str, items: &[Value]) {
        Mock::given(method("GET"))
            .and(path(Self::api_path(resource)))
            .and(query_param(key, value))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-WP-Total", items.len().to_string().as_str())
                    .set_body_json(items),
            )
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Serve one document.
    pub async fn document(&self, resource: &str, document: Value) {
        Mock::given(method("GET"))
            .and(path(Self::api_path(resource)))
            .and(basic_auth(CONSUMER_KEY, CONSUMER_SECRET))
            .respond_with(ResponseTemplate::new(200).set_body_json(document))
            .mount(&self.server)
            .await;
    }

    /// Answer every request for `resource` with `status` and a WooCommerce
    /// style error body. Takes precedence over other mocks.
    pub async fn fail(&self, resource: &str, page: Option<u32>, status: u16) {
        let mock = Mock::given(method("GET")).and(path(Self::api_path(resource)));
        let mock = match page {
            Some(page) => mock.and(query_param("page", page.to_string())),
            None => mock,
        };
        mock.respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "code": "woocommerce_rest_failure",
            "message": "Simulated failure",
            "data": { "status": status }
        })))
        .with_priority(1)
        .mount(&self.server)
        .await;
    }

    /// Empty tag and attribute listings, enough for product queries.
    pub async fn empty_taxonomy(&self) {
        self.listing("products/tags", &[]).await;
        self.listing("products/attributes", &[]).await;
    }
}

/// `count` product documents with ids `1..=count` and price equal to id.
#[must_use]
pub fn products(count: u64) -> Vec<Value> {
    (1..=count)
        .map(|id| json!({"id": id, "name": format!("Product {id}"), "price": id.to_string()}))
        .collect()
}

/// A router and the catalog behind it.
pub struct TestApp {
    pub router: Router,
    pub catalog: Catalog,
}

impl TestApp {
    #[must_use]
    pub fn new(store: &MockStore) -> Self {
        Self::with_cache(store, &CacheConfig::default())
    }

    #[must_use]
    pub fn with_cache(store: &MockStore, cache: &CacheConfig) -> Self {
        let client = WooClient::new(&store.config()).expect("HTTP client builds");
        let catalog = Catalog::new(Arc::new(client), cache, Arc::new(SystemClock));
        let router = catalog_proxy_server::router(AppState::new(catalog.clone()));
        Self { router, catalog }
    }

    /// Send a request and return status, headers and JSON body.
    pub async fn send(&self, method: Method, uri: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request builds");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        Response {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Method::GET, uri).await
    }
}

/// A buffered response.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl Response {
    /// Ids of the products in a query result page.
    #[must_use]
    pub fn product_ids(&self) -> Vec<u64> {
        self.body["data"]
            .as_array()
            .map(|items| items.iter().filter_map(|p| p["id"].as_u64()).collect())
            .unwrap_or_default()
    }
}
