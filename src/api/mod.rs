//! HTTP access to the remote catalog service.

mod backend;
pub mod endpoints;
mod error;

pub use backend::{CatalogBackend, HttpBackend};
pub use error::FetchError;
