//! Blossom Core - Shared types library.
//!
//! This crate provides common types used across all Blossom components:
//! - `client` - The storefront client SDK (session, gateway, ledgers)
//! - `cli` - Command-line harness for browsing and cart/favorites management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, catalog/cart/order value objects, checkout
//!   validation, and the paginated response envelope

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
