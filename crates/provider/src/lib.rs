//! Identity provider abstraction
//!
//! Defines the `IdentityProvider` trait that decouples the request handler
//! from any particular identity service. The Cognito adapter in the service
//! crate implements it against `AdminInitiateAuth`; `MockProvider` implements
//! it for tests.

pub mod flow;
pub mod mock;

pub use flow::{AuthFlow, PASSWORD_PARAM, REFRESH_TOKEN_PARAM, USERNAME_PARAM};
pub use mock::{MockProvider, RecordedRequest};

use std::future::Future;
use std::pin::Pin;

/// One call to the provider's administrative "initiate auth" operation.
///
/// `flow` is `None` when the inbound credentials selected no flow and the
/// handler is configured to pass that through; the provider is expected to
/// reject such a request.
#[derive(Debug, Clone)]
pub struct InitiateAuthRequest {
    pub flow: Option<AuthFlow>,
    pub client_id: String,
    pub pool_id: String,
}

/// Tokens issued by the provider after a successful authentication.
///
/// Every field is optional: the refresh flow, for instance, does not hand
/// out a new refresh token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationResult {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
}

/// Errors from provider operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered and refused the request (bad credentials,
    /// revoked refresh token, unknown client, malformed parameters).
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    /// Authentication needs another round trip (e.g. NEW_PASSWORD_REQUIRED)
    #[error("authentication challenge required: {0}")]
    ChallengeRequired(String),

    /// The provider could not be reached or the client could not be built
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Short label used for the `auth_provider_errors_total` metric.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Rejected { .. } => "rejected",
            ProviderError::ChallengeRequired(_) => "challenge",
            ProviderError::Unavailable(_) => "unavailable",
        }
    }
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Abstraction over an identity provider's admin authentication API.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn IdentityProvider>`).
pub trait IdentityProvider: Send + Sync {
    /// Identifier for logging and health reporting (e.g. "cognito", "mock")
    fn id(&self) -> &str;

    /// Run a single authentication attempt.
    fn initiate_auth<'a>(
        &'a self,
        request: &'a InitiateAuthRequest,
    ) -> Pin<Box<dyn Future<Output = Result<AuthenticationResult>> + Send + 'a>>;
}
