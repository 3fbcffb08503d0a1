//! Client for the hosted backend (PocketBase-compatible REST API).
//!
//! # Architecture
//!
//! - The backend is the source of truth for users, catalog, carts and orders
//! - No local database: every read and write is a direct REST call
//! - Category lists are cached in memory via `moka` and invalidated on writes
//! - Access control is enforced by the backend's collection rules; callers pass
//!   the visitor's auth token and the backend decides
//!
//! # Example
//!
//! ```rust,ignore
//! use madio_storefront::backend::{BackendClient, ProductSearch};
//!
//! let client = BackendClient::new(&config.backend)?;
//!
//! let featured = client.featured_products(8).await?;
//! let product = client.product(&featured[0].id).await?;
//! let related = client.related_products(&product, 4).await?;
//! ```

mod accounts;
pub mod admin;
mod cache;
mod cart_items;
mod catalog;
mod client;
mod orders;
pub mod query;
pub mod types;

pub use catalog::{ProductSearch, ProductSort};
pub use client::BackendClient;
pub use query::{Filter, ListQuery};
pub use types::*;

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

/// Backend collection names.
pub mod collections {
    pub const USERS: &str = "users";
    pub const CATEGORIES: &str = "categories";
    pub const PRODUCTS: &str = "products";
    pub const CART_ITEMS: &str = "cart_items";
    pub const ORDERS: &str = "orders";
    pub const SUPERUSERS: &str = "_superusers";
}

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request.
    #[error("Backend error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        data: BTreeMap<String, FieldError>,
    },

    /// Record or collection not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured base URL cannot carry API paths.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// HTTP status reported by the backend, if the request reached it.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// Per-field validation errors, empty when the backend sent none.
    #[must_use]
    pub fn field_errors(&self) -> Option<&BTreeMap<String, FieldError>> {
        match self {
            Self::Api { data, .. } if !data.is_empty() => Some(data),
            _ => None,
        }
    }

    /// Whether the error is a missing record.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A single field validation error from the backend.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// JSON error body returned with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: BTreeMap<String, FieldError>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("products/abc".to_string());
        assert_eq!(err.to_string(), "Not found: products/abc");
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_api_error_body_decodes_field_errors() {
        let body = r#"{
            "status": 400,
            "message": "Failed to create record.",
            "data": {
                "email": {"code": "validation_not_unique", "message": "Value must be unique."}
            }
        }"#;
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, 400);
        assert_eq!(
            parsed.data.get("email").map(|e| e.code.as_str()),
            Some("validation_not_unique")
        );
    }

    #[test]
    fn test_field_errors_none_when_empty() {
        let err = BackendError::Api {
            status: 400,
            message: "Failed to authenticate.".to_string(),
            data: BTreeMap::new(),
        };
        assert!(err.field_errors().is_none());
        assert_eq!(err.status(), Some(400));
    }
}
