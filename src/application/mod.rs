//! Catalog services: the cache-coherent client and the helpers views use on
//! top of it.

pub mod catalog;
pub mod categories;
pub mod error;
pub mod pagination;
pub mod search;
pub mod subscription;

pub use catalog::{CatalogClient, QueryOutput};
pub use error::AppError;
pub use subscription::{QueryResult, QueryState, Subscription};
