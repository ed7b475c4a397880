//! Service-specific error types

use thiserror::Error;

/// Lambda hosting errors.
///
/// Per-request failures never show up here: the handler turns them into
/// JSON responses.
#[derive(Error, Debug)]
pub enum Error {
    #[error("AWS_LAMBDA_RUNTIME_API is not set")]
    MissingRuntimeApi,

    #[error("Lambda runtime API request failed: {0}")]
    Runtime(String),

    #[error("invalid Lambda event: {0}")]
    InvalidEvent(String),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
