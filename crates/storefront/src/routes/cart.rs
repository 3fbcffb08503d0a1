//! Cart route handlers.
//!
//! Every write goes through [`CartService`](crate::services::CartService) and
//! redirects back (post/redirect/get). A write the store did not accept
//! leaves the cart changed for this session and shows a warning.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use madio_core::ProductId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Chrome, cart_service, safe_redirect, set_flash};
use crate::backend::collections;
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Flash;
use crate::services::{Cart, CartError, CartUpdate};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub product_id: String,
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub stock: u32,
    pub line_total: String,
    pub image_url: Option<String>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub total: String,
}

impl CartView {
    #[must_use]
    pub fn new(state: &AppState, cart: &Cart) -> Self {
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineView {
                    product_id: line.product.id.to_string(),
                    name: line.product.name.clone(),
                    price: line.product.price.display(),
                    quantity: line.quantity,
                    stock: line.product.stock,
                    line_total: line.total().display(),
                    image_url: state.backend().file_url(
                        collections::PRODUCTS,
                        line.product.id.as_str(),
                        &line.product.image,
                        Some("100x100"),
                    ),
                })
                .collect(),
            item_count: cart.total_items(),
            total: cart.total_price().display(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
    /// Page to return to.
    pub redirect: Option<String>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: i64,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub chrome: Chrome,
    pub cart: CartView,
}

/// Warn when the store did not accept the write.
async fn report(session: &Session, update: &CartUpdate) {
    if !update.persisted {
        set_flash(
            session,
            Flash::warning("Your cart changed, but we could not save it. Please try again later"),
        )
        .await;
    }
}

/// Turn visitor-facing cart errors into a flash message, pass the rest on.
async fn flash_cart_error(session: &Session, err: CartError) -> Result<(), AppError> {
    match err {
        CartError::OutOfStock(name) => {
            set_flash(session, Flash::error(format!("{name} is out of stock"))).await;
            Ok(())
        }
        CartError::ProductNotFound(_) | CartError::NotInCart(_) => {
            set_flash(session, Flash::error("That product is no longer available")).await;
            Ok(())
        }
        other => Err(other.into()),
    }
}

/// Display the cart page.
#[instrument(skip(state, session, chrome, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    chrome: Chrome,
) -> Result<impl IntoResponse, AppError> {
    let cart = cart_service(&state, &session, user).cart().await?;
    Ok(CartShowTemplate {
        chrome,
        cart: CartView::new(&state, &cart),
    })
}

/// Add a product to the cart.
#[instrument(skip(state, session, user, form), fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let product_id = ProductId::new(form.product_id);
    let service = cart_service(&state, &session, user);

    match service.add(&product_id, form.quantity.unwrap_or(1)).await {
        Ok(update) => {
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
            if update.persisted {
                set_flash(&session, Flash::success("Added to your cart")).await;
            } else {
                report(&session, &update).await;
            }
        }
        Err(e) => flash_cart_error(&session, e).await?,
    }

    Ok(Redirect::to(&safe_redirect(form.redirect.as_deref(), "/cart")).into_response())
}

/// Set a line's quantity; zero or less removes it.
#[instrument(skip(state, session, user, form), fields(product_id = %form.product_id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response, AppError> {
    let service = cart_service(&state, &session, user);
    match service
        .set_quantity(&ProductId::new(form.product_id), form.quantity)
        .await
    {
        Ok(update) => report(&session, &update).await,
        Err(e) => flash_cart_error(&session, e).await?,
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Remove a line.
#[instrument(skip(state, session, user, form), fields(product_id = %form.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response, AppError> {
    let service = cart_service(&state, &session, user);
    match service.remove(&ProductId::new(form.product_id)).await {
        Ok(update) => report(&session, &update).await,
        Err(e) => flash_cart_error(&session, e).await?,
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Remove every line.
#[instrument(skip(state, session, user))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response, AppError> {
    let update = cart_service(&state, &session, user).clear().await?;
    report(&session, &update).await;
    Ok(Redirect::to("/cart").into_response())
}

/// Number of units in the cart, as plain text.
#[instrument(skip(state, session, user))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> String {
    cart_service(&state, &session, user)
        .cart()
        .await
        .map_or(0, |cart| cart.total_items())
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::routes::NavUser;

    fn cart_view() -> CartView {
        CartView {
            lines: vec![CartLineView {
                product_id: "p1".to_string(),
                name: "Rose Lip Balm".to_string(),
                price: "250,000 Toman".to_string(),
                quantity: 2,
                stock: 5,
                line_total: "500,000 Toman".to_string(),
                image_url: None,
            }],
            item_count: 2,
            total: "500,000 Toman".to_string(),
        }
    }

    #[test]
    fn test_cart_page_links_signed_in_user_to_checkout() {
        let chrome = Chrome {
            user: Some(NavUser {
                name: "Sara".to_string(),
                is_admin: false,
            }),
            ..Chrome::default()
        };
        assert!(chrome.is_signed_in());

        let html = CartShowTemplate {
            chrome,
            cart: cart_view(),
        }
        .render()
        .unwrap();
        assert!(html.contains(r#"href="/checkout""#));
        assert!(html.contains("Rose Lip Balm"));
    }

    #[test]
    fn test_cart_page_sends_guest_to_login() {
        let html = CartShowTemplate {
            chrome: Chrome::default(),
            cart: cart_view(),
        }
        .render()
        .unwrap();
        assert!(html.contains("/login?redirect=/checkout"));
        assert!(!html.contains(r#"href="/checkout""#));
    }
}
