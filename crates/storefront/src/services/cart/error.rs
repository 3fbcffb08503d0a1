//! Cart error types.

use madio_core::ProductId;
use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product has no stock left.
    #[error("{0} is out of stock")]
    OutOfStock(String),

    /// The product has no line in the cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    /// The product does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session read or write failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}
