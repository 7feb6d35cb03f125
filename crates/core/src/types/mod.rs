//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod catalog;
pub mod id;
pub mod price;
pub mod size;
pub mod view;

pub use cart::{Cart, CartLine, LineChange};
pub use catalog::{CatalogSnapshot, Product};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use size::Size;
pub use view::{CartSummary, PopulatedCartLine, populate, summarize};
