//! Madio Core - Shared types library.
//!
//! This crate provides common types used across all Madio components:
//! - `storefront` - Public shop and admin back-office
//! - `cli` - Command-line tools for backend bootstrap and management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for record IDs, prices, emails, roles and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
