//! Checkout route handlers.

use std::collections::BTreeMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use madio_core::PaymentMethod;
use tower_sessions::Session;
use tracing::instrument;

use super::cart::CartView;
use super::{Chrome, cart_service};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::services::checkout::{self, CheckoutError, ShippingForm};
use crate::state::AppState;

/// Payment option for the form.
#[derive(Clone)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn payment_options(selected: &str) -> Vec<PaymentOption> {
    let selected = selected.parse().unwrap_or_default();
    PaymentMethod::ALL
        .into_iter()
        .map(|method: PaymentMethod| PaymentOption {
            value: method.as_str(),
            label: method.label(),
            selected: method == selected,
        })
        .collect()
}

/// Checkout form template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub chrome: Chrome,
    pub cart: CartView,
    pub form: ShippingForm,
    pub payment_options: Vec<PaymentOption>,
    pub errors: BTreeMap<&'static str, String>,
    pub error: Option<String>,
}

impl CheckoutTemplate {
    /// Error message for a field, empty when valid.
    #[must_use]
    pub fn field_error(&self, field: &str) -> &str {
        self.errors.get(field).map_or("", String::as_str)
    }
}

/// Order placed template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct CheckoutSuccessTemplate {
    pub chrome: Chrome,
    pub order_id: String,
    pub total: String,
}

/// Display the checkout form.
#[instrument(skip(state, session, user, chrome), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    chrome: Chrome,
) -> Result<Response, AppError> {
    let form = ShippingForm {
        full_name: user.name.clone(),
        ..ShippingForm::default()
    };
    let cart = cart_service(&state, &session, Some(user)).cart().await?;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    Ok(CheckoutTemplate {
        chrome,
        cart: CartView::new(&state, &cart),
        payment_options: payment_options(&form.payment_method),
        form,
        errors: BTreeMap::new(),
        error: None,
    }
    .into_response())
}

/// Validate the shipping form and place the order.
#[instrument(skip(state, session, user, chrome, form), fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    mut chrome: Chrome,
    Form(form): Form<ShippingForm>,
) -> Result<Response, AppError> {
    let service = cart_service(&state, &session, Some(user.clone()));
    let cart = service.cart().await?;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let (errors, error) = match form.validate() {
        Ok(shipping) => {
            match checkout::place_order(state.backend(), &user, &cart, &shipping).await {
                Ok(order) => {
                    let cleared = service.clear().await?;
                    if !cleared.persisted {
                        tracing::warn!(order_id = %order.id, "Order placed but cart not cleared remotely");
                    }
                    chrome.cart_count = 0;
                    return Ok(CheckoutSuccessTemplate {
                        chrome,
                        order_id: order.id.to_string(),
                        total: order.total.display(),
                    }
                    .into_response());
                }
                Err(CheckoutError::Backend(e)) => {
                    tracing::error!("Failed to create order: {e}");
                    (
                        BTreeMap::new(),
                        Some("We could not place your order. Please try again".to_string()),
                    )
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CheckoutError::Validation(errors)) => (errors, None),
        Err(e) => return Err(e.into()),
    };

    let status = if errors.is_empty() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((
        status,
        CheckoutTemplate {
            chrome,
            cart: CartView::new(&state, &cart),
            payment_options: payment_options(&form.payment_method),
            form,
            errors,
            error,
        },
    )
        .into_response())
}
