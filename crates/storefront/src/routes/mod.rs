//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//! GET  /health                    - Liveness
//! GET  /health/ready              - Backend readiness
//!
//! # Catalog
//! GET  /categories                - Category listing with product counts
//! GET  /products                  - Product listing (?category=&search=&sort=)
//! GET  /products/{id}             - Product detail
//!
//! # Cart
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add to cart
//! POST /cart/update               - Set quantity
//! POST /cart/remove               - Remove line
//! POST /cart/clear                - Remove every line
//! GET  /cart/count                - Item count (text)
//!
//! # Checkout (requires auth)
//! GET  /checkout                  - Shipping form
//! POST /checkout                  - Place order
//!
//! # Auth
//! GET  /login, POST /login
//! GET  /register, POST /register
//! POST /logout
//!
//! # Account (requires auth)
//! GET  /dashboard                 - Order history
//!
//! # Admin (requires admin role)
//! GET  /admin                     - Overview
//! GET  /admin/products, POST /admin/products
//! POST /admin/products/{id}, POST /admin/products/{id}/delete
//! GET  /admin/categories, POST /admin/categories
//! POST /admin/categories/{id}, POST /admin/categories/{id}/delete
//! GET  /admin/orders, POST /admin/orders/{id}/status
//! GET  /admin/users
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod dashboard;
pub mod health;
pub mod home;
pub mod products;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequestParts},
    handler::Handler,
    http::request::Parts,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::middleware::{CspNonce, OptionalAuth, auth_rate_limiter, cart_rate_limiter};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::services::CartService;
use crate::state::AppState;

// =============================================================================
// Page chrome
// =============================================================================

/// Navigation identity for templates.
#[derive(Clone)]
pub struct NavUser {
    pub name: String,
    pub is_admin: bool,
}

/// Data every full page renders: navigation, cart badge, flash notice and
/// the CSP nonce.
#[derive(Clone, Default)]
pub struct Chrome {
    pub user: Option<NavUser>,
    pub cart_count: u32,
    pub flash: Option<Flash>,
    pub nonce: String,
}

impl Chrome {
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

impl FromRequestParts<AppState> for Chrome {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CspNonce(nonce) = CspNonce::from_request_parts(parts, state).await?;
        let OptionalAuth(user) = OptionalAuth::from_request_parts(parts, state).await?;
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Ok(Self {
                nonce,
                ..Self::default()
            });
        };

        let nav = user.as_ref().map(|user| NavUser {
            name: user.display_name().to_string(),
            is_admin: user.is_admin(),
        });

        // The first page after login is where the anonymous cart is merged.
        let cart_count = match cart_service(state, &session, user).cart().await {
            Ok(cart) => cart.total_items(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load cart for navigation");
                0
            }
        };

        let flash = take_flash(&session).await;

        Ok(Self {
            user: nav,
            cart_count,
            flash,
            nonce,
        })
    }
}

/// Cart service for the visitor behind `session`.
#[must_use]
pub fn cart_service(state: &AppState, session: &Session, user: Option<CurrentUser>) -> CartService {
    CartService::new(session.clone(), state.backend().clone(), user)
}

/// Queue a notice for the next rendered page.
pub async fn set_flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(session_keys::FLASH, flash).await {
        tracing::error!("Failed to store flash message: {e}");
    }
}

async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}

/// Only allow same-site relative redirect targets.
#[must_use]
pub fn safe_redirect(target: Option<&str>, fallback: &'static str) -> String {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => fallback.to_string(),
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories::index))
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let writes = Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .layer(cart_rate_limiter());

    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .merge(writes)
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let submissions = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .merge(submissions)
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::overview::index))
        .route(
            "/products",
            get(admin::products::index).post(admin::products::create),
        )
        .route("/products/{id}", post(admin::products::update))
        .route("/products/{id}/delete", post(admin::products::delete))
        .route(
            "/categories",
            get(admin::categories::index).post(admin::categories::create),
        )
        .route("/categories/{id}", post(admin::categories::update))
        .route("/categories/{id}/delete", post(admin::categories::delete))
        .route("/orders", get(admin::orders::index))
        .route("/orders/{id}/status", post(admin::orders::update_status))
        .route("/users", get(admin::users::index))
        // Room for the text fields next to a full-size image.
        .layer(DefaultBodyLimit::max(admin::MAX_UPLOAD_BYTES + 64 * 1024))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .route(
            "/checkout",
            get(checkout::show).post(checkout::submit.layer(cart_rate_limiter())),
        )
        .merge(auth_routes())
        .route("/dashboard", get(dashboard::index))
        .nest("/admin", admin_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/products/abc"), "/cart"), "/products/abc");
        assert_eq!(safe_redirect(Some("//evil.example"), "/cart"), "/cart");
        assert_eq!(safe_redirect(Some("https://evil.example"), "/cart"), "/cart");
        assert_eq!(safe_redirect(Some("/\\evil"), "/cart"), "/cart");
        assert_eq!(safe_redirect(None, "/cart"), "/cart");
    }
}
