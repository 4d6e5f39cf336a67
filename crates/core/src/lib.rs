//! Dronshop Core - Shared domain types.
//!
//! This crate provides common types used across all Dronshop components:
//! - `server` - The JSON API (catalog, checkout, auth, admin)
//! - `cli` - Command-line tools for migrations, seeding and admin bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP. Database encoding is available behind the `postgres`
//! feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, contact types, prices, order statuses and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
