use bidsheet_core::error::{BidsheetError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("rate limited by server")]
    RateLimited,

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("could not read {path}: {source}")]
    Local {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Transport failures, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::RateLimited => true,
            FetchError::Http(status) => status.is_server_error(),
            FetchError::NotFound(_) | FetchError::Local { .. } => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not replace checkpoint file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] BidsheetError),

    #[error("retrieval failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("checkpoint store: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error("could not start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("{kind}: {message}")]
    Document { kind: ErrorKind, message: String },
}
