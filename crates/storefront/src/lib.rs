//! Atelier storefront cart library.
//!
//! Cart state for anonymous and signed-in shoppers, the storage backends it
//! persists to, and the catalog it is priced against.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use cart::{CartManager, MergeReport};
pub use config::{AtelierConfig, CartConfig};
pub use error::{CartError, StoreError};
