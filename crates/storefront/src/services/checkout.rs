//! Checkout: shipping form validation and order creation.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use madio_core::{OrderStatus, PaymentMethod, Price};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::backend::{BackendClient, BackendError, NewOrder, Order, OrderItem, ShippingInfo};
use crate::models::CurrentUser;
use crate::services::cart::Cart;

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^09\d{9}$").expect("Invalid regex"));

static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10}$").expect("Invalid regex"));

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// One or more form fields are invalid, keyed by field name.
    #[error("invalid shipping details")]
    Validation(BTreeMap<&'static str, String>),

    /// Nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// Order payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Submitted checkout form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub payment_method: String,
}

/// A validated checkout form.
#[derive(Debug, Clone)]
pub struct ValidShipping {
    pub info: ShippingInfo,
    pub payment_method: PaymentMethod,
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

impl ShippingForm {
    /// Validate every field, collecting one message per invalid field.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` with the per-field messages.
    pub fn validate(&self) -> Result<ValidShipping, CheckoutError> {
        let mut errors = BTreeMap::new();

        let required = [
            ("full_name", &self.full_name, "Full name is required"),
            ("phone", &self.phone, "Phone number is required"),
            ("address", &self.address, "Address is required"),
            ("city", &self.city, "City is required"),
            ("postal_code", &self.postal_code, "Postal code is required"),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.insert(field, message.to_string());
            }
        }

        let phone = strip_whitespace(&self.phone);
        if !phone.is_empty() && !PHONE.is_match(&phone) {
            errors.insert(
                "phone",
                "Phone number must be 11 digits starting with 09".to_string(),
            );
        }

        let postal_code = strip_whitespace(&self.postal_code);
        if !postal_code.is_empty() && !POSTAL_CODE.is_match(&postal_code) {
            errors.insert("postal_code", "Postal code must be 10 digits".to_string());
        }

        let payment_method = if self.payment_method.is_empty() {
            PaymentMethod::default()
        } else if let Ok(method) = self.payment_method.parse() {
            method
        } else {
            errors.insert("payment_method", "Choose a payment method".to_string());
            PaymentMethod::default()
        };

        if !errors.is_empty() {
            return Err(CheckoutError::Validation(errors));
        }

        let notes = self.notes.trim();
        Ok(ValidShipping {
            info: ShippingInfo {
                full_name: self.full_name.trim().to_string(),
                phone,
                address: self.address.trim().to_string(),
                city: self.city.trim().to_string(),
                postal_code,
                notes: (!notes.is_empty()).then(|| notes.to_string()),
            },
            payment_method,
        })
    }
}

/// Snapshot the cart lines as order items.
#[must_use]
pub fn order_items(cart: &Cart) -> Vec<OrderItem> {
    cart.lines()
        .iter()
        .map(|line| OrderItem {
            product_id: line.product.id.clone(),
            product_name: line.product.name.clone(),
            price: line.product.price,
            quantity: line.quantity,
            total: line.total(),
        })
        .collect()
}

/// Build the order body for a cart.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` for an empty cart.
pub fn build_order(
    user: &CurrentUser,
    cart: &Cart,
    shipping: &ValidShipping,
) -> Result<NewOrder, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let items = order_items(cart);
    let total: Price = items.iter().map(|item| item.total).sum();

    Ok(NewOrder {
        user: user.id.clone(),
        items: serde_json::to_string(&items)?,
        total,
        status: OrderStatus::Pending,
        shipping_info: serde_json::to_string(&shipping.info)?,
        payment_method: shipping.payment_method,
    })
}

/// Create the order in the backend.
///
/// # Errors
///
/// Returns an error if the cart is empty or the backend rejects the order.
#[instrument(skip_all, fields(user_id = %user.id, items = cart.total_items()))]
pub async fn place_order(
    client: &BackendClient,
    user: &CurrentUser,
    cart: &Cart,
    shipping: &ValidShipping,
) -> Result<Order, CheckoutError> {
    let body = build_order(user, cart, shipping)?;
    let order = client.create_order(&body, &user.token).await?;
    info!(order_id = %order.id, total = %order.total, "Order placed");
    Ok(order)
}
