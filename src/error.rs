use thiserror::Error;

/// A single resource could not be fetched. Recovered by the collector.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Missing(String),
}

/// Archive assembly or save failed. Fatal to the current collection.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BundleError>;
