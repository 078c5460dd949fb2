use thiserror::Error;

/// Why a single fan-out endpoint call produced no data.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Endpoint task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("AI request timed out after {0}s")]
    Timeout(u64),

    #[error("AI request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid catalog URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Catalog request timed out after {0}s")]
    Timeout(u64),

    #[error("Catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Catalog returned status {0}")]
    Status(u16),
}
