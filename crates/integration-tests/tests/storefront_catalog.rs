//! Integration tests for the public catalog pages.
//!
//! These tests require a running storefront with a seeded backend.
//! Run with: cargo test -p madio-integration-tests -- --ignored

use madio_integration_tests::{browser, products_in_stock, storefront_url};
use reqwest::StatusCode;

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_health_endpoints() {
    let client = browser();

    let resp = client
        .get(format!("{}/health", storefront_url()))
        .send()
        .await
        .expect("Failed to get health");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{}/health/ready", storefront_url()))
        .send()
        .await
        .expect("Failed to get readiness");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_home_lists_categories_and_featured() {
    let resp = browser()
        .get(storefront_url())
        .send()
        .await
        .expect("Failed to get home page");

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("content-security-policy"));
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Categories"));
    assert!(body.contains("Featured"));
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_product_search_and_sort() {
    let products = products_in_stock(1, 1).await;
    let product = products.first().expect("Seed data has products");

    let resp = browser()
        .get(format!("{}/products", storefront_url()))
        .query(&[("search", product.name.as_str()), ("sort", "price")])
        .send()
        .await
        .expect("Failed to search products");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains(&product.name));
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_product_detail_and_missing_product() {
    let client = browser();
    let products = products_in_stock(1, 1).await;
    let product = products.first().expect("Seed data has products");

    let resp = client
        .get(format!("{}/products/{}", storefront_url(), product.id))
        .send()
        .await
        .expect("Failed to get product");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains(&product.name));

    let resp = client
        .get(format!("{}/products/doesnotexist000", storefront_url()))
        .send()
        .await
        .expect("Failed to get missing product");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_categories_page() {
    let resp = browser()
        .get(format!("{}/categories", storefront_url()))
        .send()
        .await
        .expect("Failed to get categories");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("products"));
}
