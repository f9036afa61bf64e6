//! Attribute and category endpoints against a mock store.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use catalog_proxy_integration_tests::{MockStore, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_attributes_listing_shape() {
    let store = MockStore::start().await;
    store
        .listing(
            "products/attributes",
            &[json!({"id": 1, "name": "Color"}), json!({"id": 2, "name": "Size"})],
        )
        .await;
    let app = TestApp::new(&store);

    let response = app.get("/attributes").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["totalAttributes"], 2);
    assert_eq!(response.body["data"][1]["name"], "Size");
    assert!(response.body["timestamp"].is_string());
}

#[tokio::test]
async fn test_single_attribute_is_passed_through() {
    let store = MockStore::start().await;
    store
        .document(
            "products/attributes/3",
            json!({"id": 3, "name": "Material", "slug": "pa_material", "order_by": "menu_order"}),
        )
        .await;
    let app = TestApp::new(&store);

    let response = app.get("/attributes/3").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["order_by"], "menu_order");
}

#[tokio::test]
async fn test_categories_are_top_level_only() {
    let store = MockStore::start().await;
    store
        .listing(
            "products/categories",
            &[
                json!({"id": 7, "name": "Shirts", "parent": 0}),
                json!({"id": 8, "name": "Polos", "parent": 7}),
                json!({"id": 9, "name": "Hats", "parent": 0}),
            ],
        )
        .await;
    let app = TestApp::new(&store);

    let response = app.get("/categories").await;
    assert_eq!(response.status, StatusCode::OK);
    let names: Vec<_> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Shirts", "Hats"]);
}

#[tokio::test]
async fn test_subcategories_query_by_parent() {
    let store = MockStore::start().await;
    store
        .filtered_listing(
            "products/categories",
            "parent",
            "7",
            &[json!({"id": 8, "name": "Polos", "parent": 7})],
        )
        .await;
    let app = TestApp::new(&store);

    let response = app.get("/categories/7/subcategories").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["totalSubcategories"], 1);
    assert_eq!(response.body["data"][0]["id"], 8);
}

#[tokio::test]
async fn test_category_document_and_not_found() {
    let store = MockStore::start().await;
    store
        .document("products/categories/7", json!({"id": 7, "name": "Shirts"}))
        .await;
    store.fail("products/categories/99", None, 404).await;
    let app = TestApp::new(&store);

    let found = app.get("/categories/7").await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["name"], "Shirts");

    let missing = app.get("/categories/99").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["upstream"]["data"]["status"], 404);

    let invalid = app.get("/categories/shirts").await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upstream_outage_surfaces_as_server_error() {
    let store = MockStore::start().await;
    store.fail("products/attributes", None, 503).await;
    let app = TestApp::new(&store);

    let response = app.get("/attributes").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}
