//! Category options for editing a product.

use catalog_types::Category;
use serde::Serialize;

/// A selectable category: `value` goes into a patch, `label` is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOption {
    pub value: String,
    pub label: String,
}

impl From<&Category> for CategoryOption {
    fn from(category: &Category) -> Self {
        Self {
            value: category.value().to_string(),
            label: capitalize(category.name()),
        }
    }
}

/// Builds options in service order, skipping entries without a usable value.
pub fn options(categories: &[Category]) -> Vec<CategoryOption> {
    categories
        .iter()
        .filter(|category| !category.value().is_empty())
        .map(CategoryOption::from)
        .collect()
}

pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
