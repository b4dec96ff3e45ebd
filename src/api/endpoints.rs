//! Endpoint declarations.
//!
//! Maps each query key to its request, decodes the response body and declares
//! the tags the result provides.

use std::collections::HashSet;
use std::time::Instant;

use catalog_types::{Category, Product, ProductsResponse, UpdateProductRequest};
use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::backend::CatalogBackend;
use super::error::FetchError;
use crate::cache::{CachedValue, QueryKey, Tag};

const METRIC_FETCH_MS: &str = "catalog_fetch_ms";
const METRIC_FETCH_ERROR: &str = "catalog_fetch_error_total";

/// Relative path and query pairs for a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub path: String,
    pub query: Vec<(&'static str, String)>,
}

pub fn request_for(key: &QueryKey) -> Request {
    match key {
        QueryKey::Products { limit, skip } => Request {
            path: "products".into(),
            query: vec![("limit", limit.to_string()), ("skip", skip.to_string())],
        },
        // limit=0 asks the service for the whole collection.
        QueryKey::AllProducts => Request {
            path: "products".into(),
            query: vec![("limit", "0".into())],
        },
        QueryKey::ProductById(id) => Request {
            path: product_path(*id),
            query: Vec::new(),
        },
        QueryKey::Categories => Request {
            path: "products/categories".into(),
            query: Vec::new(),
        },
    }
}

pub fn product_path(id: u64) -> String {
    format!("products/{id}")
}

fn from_value<T: DeserializeOwned>(body: Value) -> Result<T, FetchError> {
    Ok(serde_json::from_value(body)?)
}

fn decode_page(body: Value, requested_limit: u64) -> Result<ProductsResponse, FetchError> {
    let page: ProductsResponse = from_value(body)?;
    page.check_page(requested_limit)
        .map_err(|e| FetchError::decode(e.to_string()))?;
    Ok(page)
}

/// Decodes the body of a read into the value cached for `key`.
pub fn decode(key: &QueryKey, body: Value) -> Result<CachedValue, FetchError> {
    match key {
        QueryKey::Products { limit, .. } => {
            decode_page(body, u64::from(*limit)).map(CachedValue::Products)
        }
        QueryKey::AllProducts => decode_page(body, 0).map(CachedValue::Products),
        QueryKey::ProductById(_) => from_value::<Product>(body).map(CachedValue::Product),
        QueryKey::Categories => from_value::<Vec<Category>>(body).map(CachedValue::Categories),
    }
}

/// Tags a successful result provides.
///
/// A page provides one tag per product it contains plus the collection
/// sentinel; the unbounded listing provides only the sentinel; categories
/// provide nothing and are cached by key alone.
pub fn provided_tags(key: &QueryKey, value: &CachedValue) -> HashSet<Tag> {
    match (key, value) {
        (QueryKey::Products { .. }, CachedValue::Products(page)) => page
            .ids()
            .map(Tag::product)
            .chain([Tag::PRODUCT_LIST])
            .collect(),
        (QueryKey::Products { .. } | QueryKey::AllProducts, _) => HashSet::from([Tag::PRODUCT_LIST]),
        (QueryKey::ProductById(id), _) => HashSet::from([Tag::product(*id)]),
        (QueryKey::Categories, _) => HashSet::new(),
    }
}

/// Performs the read for `key` and decodes it.
pub async fn fetch(backend: &dyn CatalogBackend, key: &QueryKey) -> Result<CachedValue, FetchError> {
    let started_at = Instant::now();
    let request = request_for(key);
    let result = match backend.get(&request.path, &request.query).await {
        Ok(body) => decode(key, body),
        Err(error) => Err(error),
    };

    let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_FETCH_MS, "endpoint" => endpoint_label(key)).record(elapsed_ms);
    match &result {
        Ok(_) => debug!(query_key = %key, elapsed_ms, "Query fetched"),
        Err(error) => {
            counter!(METRIC_FETCH_ERROR, "endpoint" => endpoint_label(key)).increment(1);
            warn!(query_key = %key, elapsed_ms, error = %error, "Query failed");
        }
    }
    result
}

/// Sends the sparse patch for product `id` and decodes the updated product.
pub async fn update_product(
    backend: &dyn CatalogBackend,
    id: u64,
    patch: &UpdateProductRequest,
) -> Result<Product, FetchError> {
    let body = serde_json::to_value(patch)?;
    let response = backend.patch(&product_path(id), body).await;
    let result = response.and_then(from_value::<Product>);
    if let Err(error) = &result {
        counter!(METRIC_FETCH_ERROR, "endpoint" => "update_product").increment(1);
        warn!(product_id = id, error = %error, "Product update failed");
    }
    result
}

fn endpoint_label(key: &QueryKey) -> &'static str {
    match key {
        QueryKey::Products { .. } => "list_products",
        QueryKey::AllProducts => "list_all_products",
        QueryKey::ProductById(_) => "get_product_by_id",
        QueryKey::Categories => "list_categories",
    }
}
