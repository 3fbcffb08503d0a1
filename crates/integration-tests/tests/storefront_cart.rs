//! Integration tests for the cart and the login-time merge.
//!
//! These tests require a running storefront with a seeded backend.
//! Run with: cargo test -p madio-integration-tests -- --ignored

use madio_integration_tests::{
    TestUser, add_to_cart, browser, cart_count, login, products_in_stock, register,
    storefront_url,
};
use reqwest::{StatusCode, header};

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_guest_cart_lifecycle() {
    let client = browser();
    let products = products_in_stock(3, 2).await;
    let (first, second) = match products.as_slice() {
        [a, b, ..] => (a, b),
        _ => panic!("Seed data needs two products with stock"),
    };

    assert_eq!(cart_count(&client).await, 0);

    add_to_cart(&client, &first.id, 2).await;
    add_to_cart(&client, &second.id, 1).await;
    assert_eq!(cart_count(&client).await, 3);

    let resp = client
        .post(format!("{}/cart/update", storefront_url()))
        .form(&[("product_id", first.id.as_str()), ("quantity", "0")])
        .send()
        .await
        .expect("Failed to update cart");
    assert!(resp.status().is_redirection());
    assert_eq!(cart_count(&client).await, 1);

    let resp = client
        .post(format!("{}/cart/clear", storefront_url()))
        .send()
        .await
        .expect("Failed to clear cart");
    assert!(resp.status().is_redirection());
    assert_eq!(cart_count(&client).await, 0);
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_quantity_is_clamped_to_stock() {
    let client = browser();
    let products = products_in_stock(1, 1).await;
    let product = products.first().expect("Seed data has products");

    add_to_cart(&client, &product.id, product.stock + 50).await;
    assert_eq!(cart_count(&client).await, product.stock);
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_guest_cart_merges_on_login() {
    let user = TestUser::unique();
    let products = products_in_stock(5, 1).await;
    let product = products.first().expect("Seed data needs a product with stock >= 5");

    // Account cart: 2 units.
    let account = browser();
    register(&account, &user).await;
    add_to_cart(&account, &product.id, 2).await;
    assert_eq!(cart_count(&account).await, 2);

    // Guest cart in a new browser: 2 more units, then sign in.
    let guest = browser();
    add_to_cart(&guest, &product.id, 2).await;
    let resp = login(&guest, &user).await;
    assert!(resp.status().is_redirection());
    assert_eq!(cart_count(&guest).await, 4);

    // The merged cart is persisted in the account.
    let again = browser();
    login(&again, &user).await;
    assert_eq!(cart_count(&again).await, 4);
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded backend"]
async fn test_logout_starts_an_empty_guest_cart() {
    let user = TestUser::unique();
    let products = products_in_stock(1, 1).await;
    let product = products.first().expect("Seed data has products");

    let client = browser();
    register(&client, &user).await;
    add_to_cart(&client, &product.id, 1).await;

    let resp = client
        .post(format!("{}/logout", storefront_url()))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");
    assert_eq!(cart_count(&client).await, 0);
}
