//! Domain models for storefront.
//!
//! Catalog and order records live in [`crate::backend::types`]; this module
//! holds what the storefront keeps in the visitor's session.

pub mod session;

pub use session::{CurrentUser, Flash, FlashLevel, keys as session_keys};
