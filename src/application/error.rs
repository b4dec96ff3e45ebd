use catalog_types::PatchError;
use thiserror::Error;

use crate::api::FetchError;
use crate::infra::error::InfraError;

use super::pagination::PaginationError;

/// Top-level failure of a catalog command.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("invalid patch: {0}")]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Fetch(error) if error.is_not_found())
    }

    /// Process exit status: 2 for bad input, 3 for a missing product, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Patch(_) | Self::Pagination(_) | Self::Validation(_) => 2,
            _ if self.is_not_found() => 3,
            _ => 1,
        }
    }

    /// Message shown to the user, with the server's body for status failures.
    pub fn report(&self) -> String {
        match self {
            Self::Fetch(FetchError::HttpStatus {
                body: Some(body), ..
            }) => {
                let detail = extract_message(body).unwrap_or_else(|| body.clone());
                format!("{self}: {detail}")
            }
            _ => self.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::Infra(InfraError::Io(error))
    }
}

/// Pulls `message` out of a JSON error body such as
/// `{"message":"Product with id '9999' not found"}`.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}
