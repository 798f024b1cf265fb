//! Error types for catalog searches

use thiserror::Error;

/// Failure modes of a catalog search
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The search was rejected before any request was sent
    #[error("Invalid search: {0}")]
    Validation(String),

    /// The catalog answered, but not with a usable result
    #[error("Catalog error: {message}")]
    Upstream {
        /// HTTP status, when the failure was a non-2xx response
        status: Option<u16>,
        message: String,
    },

    /// The request never produced a response
    #[error("Catalog request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl CatalogError {
    pub(crate) fn invalid_response() -> Self {
        CatalogError::Upstream {
            status: None,
            message: "invalid response".to_string(),
        }
    }
}

/// Type alias for Result with CatalogError
pub type CatalogResult<T> = Result<T, CatalogError>;
