use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::product::{Category, Product, Review};

/// Sparse product patch sent with `PATCH /products/{id}`.
///
/// Only fields that are `Some` go over the wire; the server leaves everything
/// else untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    #[error("`{field}` must not be empty")]
    Empty { field: &'static str },
    #[error("`{field}` must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("image #{index} has an empty URL")]
    EmptyImage { index: usize },
}

impl UpdateProductRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Checks the present fields against the product data model.
    pub fn validate(&self) -> Result<(), PatchError> {
        let required = [
            ("title", &self.title),
            ("description", &self.description),
            ("brand", &self.brand),
            ("category", &self.category),
            ("thumbnail", &self.thumbnail),
        ];
        for (field, value) in required {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(PatchError::Empty { field });
            }
        }

        check_range("price", self.price, 0.0, f64::MAX)?;
        check_range("discountPercentage", self.discount_percentage, 0.0, 100.0)?;
        check_range("rating", self.rating, 0.0, 5.0)?;

        if let Some(images) = &self.images {
            if let Some(index) = images.iter().position(|url| url.trim().is_empty()) {
                return Err(PatchError::EmptyImage { index });
            }
        }
        if let Some(reviews) = &self.reviews {
            for review in reviews {
                if review.reviewer_name.trim().is_empty() {
                    return Err(PatchError::Empty {
                        field: "reviews.reviewerName",
                    });
                }
                let blank = |value: &str| value.trim().is_empty();
                if blank(&review.comment) && review.text.as_deref().is_none_or(blank) {
                    return Err(PatchError::Empty {
                        field: "reviews.comment",
                    });
                }
                check_range("reviews.rating", Some(review.rating), 0.0, 5.0)?;
            }
        }

        Ok(())
    }

    /// Returns `product` with every present field replaced.
    pub fn apply_to(&self, product: &Product) -> Product {
        let mut merged = product.clone();
        if let Some(title) = &self.title {
            merged.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            merged.description.clone_from(description);
        }
        if let Some(price) = self.price {
            merged.price = price;
        }
        if let Some(discount) = self.discount_percentage {
            merged.discount_percentage = discount;
        }
        if let Some(rating) = self.rating {
            merged.rating = rating;
        }
        if let Some(stock) = self.stock {
            merged.stock = stock;
        }
        if let Some(brand) = &self.brand {
            merged.brand.clone_from(brand);
        }
        if let Some(category) = &self.category {
            merged.category = Category::Slug(category.clone());
        }
        if let Some(thumbnail) = &self.thumbnail {
            merged.thumbnail.clone_from(thumbnail);
        }
        if let Some(images) = &self.images {
            merged.images.clone_from(images);
        }
        if let Some(reviews) = &self.reviews {
            merged.reviews = Some(reviews.clone());
        }
        merged
    }

    /// Overlays `other` on top of `self`; fields present in `other` win.
    pub fn merge(mut self, other: Self) -> Self {
        macro_rules! overlay {
            ($($field:ident),+) => {
                $(if other.$field.is_some() { self.$field = other.$field; })+
            };
        }
        overlay!(
            title,
            description,
            price,
            discount_percentage,
            rating,
            stock,
            brand,
            category,
            thumbnail,
            images,
            reviews
        );
        self
    }
}

fn check_range(field: &'static str, value: Option<f64>, min: f64, max: f64) -> Result<(), PatchError> {
    match value {
        Some(value) if !(min..=max).contains(&value) => Err(PatchError::OutOfRange {
            field,
            min,
            max,
            value,
        }),
        _ => Ok(()),
    }
}
