//! Request and response shapes of the catalog REST API.
//!
//! Shared between the cache-aware client and anything that needs to speak the
//! wire format directly.

mod patch;
mod product;

pub use patch::{PatchError, UpdateProductRequest};
pub use product::{Category, CategoryObject, PageError, Product, ProductsResponse, Review};
