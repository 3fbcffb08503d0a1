//! Integration tests for Madio.
//!
//! The tests drive a running storefront over HTTP, with a `PocketBase`
//! backend behind it that has been prepared with `madio setup`,
//! `madio rules` and `madio seed`.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the backend and the storefront, then
//! cargo test -p madio-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` (default `http://localhost:3000`)
//! - `BACKEND_URL` (default `http://127.0.0.1:8090`)

use reqwest::{Client, redirect};
use serde::Deserialize;
use uuid::Uuid;

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL of the backend behind the storefront.
#[must_use]
pub fn backend_url() -> String {
    std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://127.0.0.1:8090".to_string())
}

/// A browser-like client: keeps cookies, does not follow redirects so the
/// tests can assert on them.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Credentials of a freshly registered shop user.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl TestUser {
    /// Unique credentials for one test run.
    #[must_use]
    pub fn unique() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            name: format!("Test {}", id.get(..8).unwrap_or_default()),
            email: format!("test-{id}@example.com"),
            password: format!("pw-{id}"),
        }
    }
}

/// Register through the storefront; the client ends up signed in.
///
/// # Panics
///
/// Panics if the request fails or registration is not accepted.
pub async fn register(client: &Client, user: &TestUser) {
    let resp = client
        .post(format!("{}/register", storefront_url()))
        .form(&[
            ("name", user.name.as_str()),
            ("email", user.email.as_str()),
            ("password", user.password.as_str()),
            ("password_confirm", user.password.as_str()),
        ])
        .send()
        .await
        .expect("Failed to register");
    assert!(
        resp.status().is_redirection(),
        "registration was not accepted: {}",
        resp.status()
    );
}

/// Sign in through the storefront.
///
/// # Panics
///
/// Panics if the request fails.
pub async fn login(client: &Client, user: &TestUser) -> reqwest::Response {
    client
        .post(format!("{}/login", storefront_url()))
        .form(&[
            ("email", user.email.as_str()),
            ("password", user.password.as_str()),
        ])
        .send()
        .await
        .expect("Failed to log in")
}

/// A product as listed by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub stock: u32,
}

#[derive(Deserialize)]
struct Page {
    items: Vec<ProductRecord>,
}

/// Products with at least `min_stock` units, straight from the backend.
///
/// # Panics
///
/// Panics if the backend cannot be reached.
pub async fn products_in_stock(min_stock: u32, limit: u32) -> Vec<ProductRecord> {
    let page: Page = Client::new()
        .get(format!("{}/api/collections/products/records", backend_url()))
        .query(&[
            ("filter", format!("stock >= {min_stock}")),
            ("perPage", limit.to_string()),
            ("sort", "name".to_string()),
        ])
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Failed to parse products");
    page.items
}

/// Units in the cart, read from `/cart/count`.
///
/// # Panics
///
/// Panics if the request fails or the body is not a number.
pub async fn cart_count(client: &Client) -> u32 {
    client
        .get(format!("{}/cart/count", storefront_url()))
        .send()
        .await
        .expect("Failed to get cart count")
        .text()
        .await
        .expect("Failed to read cart count")
        .trim()
        .parse()
        .expect("Cart count is not a number")
}

/// Add a product to the cart.
///
/// # Panics
///
/// Panics if the request fails.
pub async fn add_to_cart(client: &Client, product_id: &str, quantity: u32) {
    let resp = client
        .post(format!("{}/cart/add", storefront_url()))
        .form(&[("product_id", product_id), ("quantity", &quantity.to_string())])
        .send()
        .await
        .expect("Failed to add to cart");
    assert!(resp.status().is_redirection());
}
