//! Atelier Core - Shared domain types and cart algebra.
//!
//! This crate provides the types used by every Atelier component:
//! - `storefront` - The cart state manager and its storage collaborators
//! - `cli` - Command-line tools for migrations and cart inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no async runtime. Everything that decides what a cart
//! looks like after an operation lives here so it can be tested without
//! any collaborator.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, sizes, prices, carts, catalog snapshots and
//!   the populated (display) view

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
