//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Sign in, registration and session bookkeeping
//! - `cart` - Session/backend cart with login-time merge
//! - `checkout` - Shipping validation and order creation

pub mod auth;
pub mod cart;
pub mod checkout;

pub use auth::{AuthError, AuthService, Registration};
pub use cart::{Cart, CartError, CartLine, CartService, CartUpdate};
pub use checkout::{CheckoutError, ShippingForm};
