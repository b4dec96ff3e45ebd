use std::path::Path;

use catalog_types::UpdateProductRequest;

use crate::application::AppError;
use crate::config::EditArgs;

/// Reads a JSON patch such as `{"price": 12.5, "stock": 3}`.
pub async fn read_patch_file(path: &Path) -> Result<UpdateProductRequest, AppError> {
    let data = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&data)
        .map_err(|e| AppError::validation(format!("{}: {e}", path.display())))
}

/// Patch fields given as flags. An empty `--image` list leaves images alone.
pub fn flag_patch(args: &EditArgs) -> UpdateProductRequest {
    UpdateProductRequest {
        title: args.title.clone(),
        description: args.description.clone(),
        price: args.price,
        discount_percentage: args.discount_percentage,
        rating: args.rating,
        stock: args.stock,
        brand: args.brand.clone(),
        category: args.category.clone(),
        thumbnail: args.thumbnail.clone(),
        images: (!args.images.is_empty()).then(|| args.images.clone()),
        reviews: None,
    }
}

/// Builds the patch to send: file values first, flags on top, then validated.
pub async fn build_patch(args: &EditArgs) -> Result<UpdateProductRequest, AppError> {
    let base = match args.patch_file.as_deref() {
        Some(path) => read_patch_file(path).await?,
        None => UpdateProductRequest::default(),
    };
    let patch = base.merge(flag_patch(args));
    if patch.is_empty() {
        return Err(AppError::validation("nothing to update: pass a field flag or --patch-file"));
    }
    patch.validate()?;
    Ok(patch)
}
