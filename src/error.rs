// Error types shared by the library modules.
//
// `ApiError` covers everything that can go wrong talking to the backend or
// the local token file. `BatchError` is what a whole batch run can end
// with; per-item upload failures never show up here, they are recorded in
// the batch results instead.

use crate::batch::BatchProgress;

/// Failures raised by the API client, the credential stores and config.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Login was rejected. Carries the server's detail message.
    #[error("Login failed: {0}")]
    Authentication(String),

    /// The server answered 401 to an authorized request.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    #[error("{0}")]
    Upload(String),

    #[error("Failed to fetch images: {0}")]
    Fetch(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ways a batch run can end other than normal completion.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("no images selected")]
    Empty,

    /// The token was rejected mid-batch. `progress` holds the results
    /// recorded before the failing item.
    #[error("Session expired. Please login again.")]
    SessionExpired { progress: BatchProgress },
}
