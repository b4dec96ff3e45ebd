use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A catalog product as returned by `GET /products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub stock: u32,
    /// Some catalog entries (groceries, mostly) carry no brand.
    #[serde(default)]
    pub brand: String,
    pub category: Category,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub comment: String,
    pub rating: f64,
    #[serde(default)]
    pub reviewer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Structured category as served by newer revisions of the catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryObject {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// A category is either a bare slug or a `{slug, name, url}` object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Slug(String),
    Object(CategoryObject),
}

impl Category {
    /// Machine value used when filtering or patching: the slug, falling back
    /// to the name for objects without one.
    pub fn value(&self) -> &str {
        match self {
            Self::Slug(slug) => slug,
            Self::Object(object) if object.slug.is_empty() => &object.name,
            Self::Object(object) => &object.slug,
        }
    }

    /// Human-facing name.
    pub fn name(&self) -> &str {
        match self {
            Self::Slug(slug) => slug,
            Self::Object(object) => &object.name,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::Slug(value.to_string())
    }
}

/// One page of the product collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page reports total {total} but carries {len} products")]
    TotalTooSmall { total: u64, len: usize },
    #[error("page carries {len} products but {limit} were requested")]
    OverLimit { limit: u64, len: usize },
}

impl ProductsResponse {
    /// Checks the page against the limit it was requested with.
    ///
    /// A `requested_limit` of zero asks for the whole collection and is never
    /// exceeded.
    pub fn check_page(&self, requested_limit: u64) -> Result<(), PageError> {
        let len = self.products.len();
        if self.total < len as u64 {
            return Err(PageError::TotalTooSmall {
                total: self.total,
                len,
            });
        }
        if requested_limit > 0 && len as u64 > requested_limit {
            return Err(PageError::OverLimit {
                limit: requested_limit,
                len,
            });
        }
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.products.iter().map(|product| product.id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids().any(|candidate| candidate == id)
    }
}
