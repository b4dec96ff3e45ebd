//! Client-side filtering of a fetched page.

use catalog_types::Product;

/// Case-insensitive substring match over title, description, category and
/// brand. An empty needle matches everything.
pub fn matches(product: &Product, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [
        product.title.as_str(),
        product.description.as_str(),
        product.category.value(),
        product.category.name(),
        product.brand.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}

pub fn filter<'a>(products: &'a [Product], needle: &str) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|product| matches(product, needle))
        .collect()
}
