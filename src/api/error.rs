use thiserror::Error;

/// Failure of a single request against the catalog service.
///
/// `Clone` so the last failure can be kept in a cache entry and handed to
/// every reader of that entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network failure: {message}")]
    Network { message: String },
    #[error("server responded with status {status}")]
    HttpStatus { status: u16, body: Option<String> },
    #[error("failed to decode response: {message}")]
    Decode { message: String },
}

impl FetchError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        Self::network(error.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        Self::decode(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_a_404_status_failure() {
        let error = FetchError::HttpStatus {
            status: 404,
            body: Some(r#"{"message":"Product with id '9999' not found"}"#.into()),
        };
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "server responded with status 404");

        assert!(!FetchError::network("refused").is_not_found());
        assert_eq!(FetchError::decode("eof").status(), None);
    }

    #[test]
    fn json_errors_become_decode_failures() {
        let error = serde_json::from_str::<u64>("\"x\"").expect_err("invalid");
        assert!(matches!(FetchError::from(error), FetchError::Decode { .. }));
    }
}
