//! Integration tests for checkout, the dashboard and admin gating.
//!
//! These tests require a running storefront with a seeded backend.
//! Run with: cargo test -p madio-integration-tests -- --ignored

use madio_integration_tests::{
    TestUser, add_to_cart, browser, cart_count, products_in_stock, register, storefront_url,
};
use reqwest::{StatusCode, header};

fn shipping<'a>(phone: &'a str, postal_code: &'a str) -> Vec<(&'static str, &'a str)> {
    vec![
        ("full_name", "Sara Ahmadi"),
        ("phone", phone),
        ("address", "12 Valiasr St"),
        ("city", "Tehran"),
        ("postal_code", postal_code),
        ("notes", ""),
        ("payment_method", "cash"),
    ]
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_checkout_requires_login() {
    let resp = browser()
        .get(format!("{}/checkout", storefront_url()))
        .send()
        .await
        .expect("Failed to get checkout");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_invalid_shipping_is_rejected() {
    let client = browser();
    register(&client, &TestUser::unique()).await;
    let products = products_in_stock(1, 1).await;
    add_to_cart(&client, &products.first().expect("Seed data has products").id, 1).await;

    let resp = client
        .post(format!("{}/checkout", storefront_url()))
        .form(&shipping("12345", "123"))
        .send()
        .await
        .expect("Failed to submit checkout");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Phone number must be 11 digits"));
    assert!(body.contains("Postal code must be 10 digits"));
    assert_eq!(cart_count(&client).await, 1);
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_checkout_places_order_and_clears_cart() {
    let client = browser();
    register(&client, &TestUser::unique()).await;
    let products = products_in_stock(2, 1).await;
    let product = products.first().expect("Seed data has products");
    add_to_cart(&client, &product.id, 2).await;

    let resp = client
        .post(format!("{}/checkout", storefront_url()))
        .form(&shipping("0912 345 6789", "1234567890"))
        .send()
        .await
        .expect("Failed to submit checkout");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Thank you"));
    assert_eq!(cart_count(&client).await, 0);

    let resp = client
        .get(format!("{}/dashboard", storefront_url()))
        .send()
        .await
        .expect("Failed to get dashboard");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains(&product.name));
    assert!(body.contains("Pending"));
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_admin_screens_reject_customers() {
    let client = browser();
    register(&client, &TestUser::unique()).await;

    for path in ["/admin", "/admin/products", "/admin/orders", "/admin/users"] {
        let resp = client
            .get(format!("{}{path}", storefront_url()))
            .send()
            .await
            .expect("Failed to get admin page");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/", "{path}");
    }
}
