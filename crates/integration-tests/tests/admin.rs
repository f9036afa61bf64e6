//! Cache administration, health and middleware behavior.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use catalog_proxy_integration_tests::{MockStore, TestApp, products};
use serde_json::json;
use tower::ServiceExt;

async fn seeded_store(count: u64) -> MockStore {
    let store = MockStore::start().await;
    store.listing("products", &products(count)).await;
    store.empty_taxonomy().await;
    store.listing("products/categories", &[]).await;
    store
}

#[tokio::test]
async fn test_readiness_follows_snapshot() {
    let store = seeded_store(3).await;
    let app = TestApp::new(&store);

    assert_eq!(app.get("/health").await.status, StatusCode::OK);
    assert_eq!(app.get("/health/ready").await.status, StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(app.get("/products").await.status, StatusCode::OK);
    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_clear_cache_drops_snapshot() {
    let store = seeded_store(3).await;
    let app = TestApp::new(&store);
    app.get("/products").await;

    let response = app.get("/cache/clear-cache").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"message": "All caches cleared"}));
    assert!(!app.catalog.has_snapshot().await);
}

#[tokio::test]
async fn test_resync_reports_counts() {
    let store = seeded_store(120).await;
    let app = TestApp::new(&store);

    let response = app.send(Method::POST, "/cache/resync").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["products"], 120);
    assert_eq!(response.body["total"], 120);
    assert!(response.body["timestamp"].is_string());

    let get = app.get("/cache/resync").await;
    assert_eq!(get.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_failed_resync_keeps_previous_snapshot() {
    let store = seeded_store(5).await;
    let app = TestApp::new(&store);
    assert_eq!(app.get("/products").await.body["totalProducts"], 5);

    store.fail("products", Some(1), 502).await;

    let response = app.send(Method::POST, "/cache/resync").await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["upstream"]["code"], "woocommerce_rest_failure");

    let after = app.get("/products").await;
    assert_eq!(after.status, StatusCode::OK);
    assert_eq!(after.body["totalProducts"], 5);
}

#[tokio::test]
async fn test_init_warms_in_background() {
    let store = seeded_store(4).await;
    let app = TestApp::new(&store);

    let response = app.get("/cache/init").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["message"].as_str().unwrap().starts_with("Initiated successfully"));

    let mut ready = false;
    for _ in 0..100 {
        if app.catalog.has_snapshot().await {
            ready = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(ready, "warm-up never stored a snapshot");
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let store = MockStore::start().await;
    let app = TestApp::new(&store);

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "storefront-42")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "storefront-42");

    let generated = app.get("/health").await;
    let id = generated.headers["x-request-id"].to_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let store = MockStore::start().await;
    let app = TestApp::new(&store);

    assert_eq!(app.get("/orders").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight_is_answered_before_inner_layers() {
    let store = MockStore::start().await;
    let app = TestApp::new(&store);

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/products")
        .header("origin", "https://shop.example")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(preflight).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("access-control-allow-origin"));
    assert!(!response.headers().contains_key("x-request-id"));

    let simple = app.get("/health").await;
    assert_eq!(simple.headers["access-control-allow-origin"], "*");
    assert!(simple.headers.contains_key("x-request-id"));
}
