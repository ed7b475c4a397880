//! Error types for Cognito API calls

/// Errors from Cognito authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The service returned an error document, e.g. `NotAuthorizedException`
    #[error("{code}: {message}")]
    Api { code: String, message: String },

    /// The service asked for another round trip instead of issuing tokens
    #[error("challenge required: {0}")]
    Challenge(String),

    #[error("missing AWS credentials: {0} is not set")]
    MissingCredentials(&'static str),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result alias for Cognito operations.
pub type Result<T> = std::result::Result<T, Error>;
