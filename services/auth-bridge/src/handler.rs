//! Auth request handling
//!
//! Turns a raw request body into a provider call and the provider's answer
//! into a JSON response. Platform-neutral: the HTTP server and the Lambda
//! runtime both feed bodies through `AuthHandler::handle`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use provider::{AuthenticationResult, IdentityProvider, InitiateAuthRequest, ProviderError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Span, error, info, instrument, warn};

use crate::config::TenantConfig;
use crate::credentials::CredentialInput;
use crate::metrics;

/// Token bundle returned on success. Absent tokens serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenBundle {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl From<AuthenticationResult> for TokenBundle {
    fn from(result: AuthenticationResult) -> Self {
        Self {
            access_token: result.access_token,
            id_token: result.id_token,
            refresh_token: result.refresh_token,
            expires_in: result.expires_in,
        }
    }
}

/// Error categories of the JSON error envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    MissingCredentials,
    AuthError,
    ChallengeRequired,
    Infrastructure,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::MissingCredentials => "missing_credentials",
            ErrorKind::AuthError => "auth_error",
            ErrorKind::ChallengeRequired => "challenge_required",
            ErrorKind::Infrastructure => "infrastructure_error",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// Every failure of the provider call, transport included, is a 400;
    /// only the bridge's own faults are 500.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::InvalidRequest
            | ErrorKind::MissingCredentials
            | ErrorKind::AuthError
            | ErrorKind::ChallengeRequired
            | ErrorKind::Infrastructure => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Status plus JSON body, independent of the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HandlerResponse {
    /// Build the error envelope
    /// `{"error":{"type":..,"message":..,"request_id":..,"code"?:..}}`.
    pub fn error(kind: ErrorKind, message: &str, request_id: &str, code: Option<&str>) -> Self {
        let mut error = serde_json::json!({
            "type": kind.as_str(),
            "message": message,
            "request_id": request_id,
        });
        if let Some(code) = code {
            error["code"] = serde_json::Value::String(code.to_string());
        }
        Self {
            status: kind.status(),
            body: serde_json::json!({ "error": error }).to_string(),
        }
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

/// Map a provider failure to its envelope kind, message and optional code.
fn classify(err: &ProviderError) -> (ErrorKind, String, Option<&str>) {
    match err {
        ProviderError::Rejected { code, message } => {
            (ErrorKind::AuthError, message.clone(), Some(code.as_str()))
        }
        ProviderError::ChallengeRequired(_) => (ErrorKind::ChallengeRequired, err.to_string(), None),
        ProviderError::Unavailable(_) => (ErrorKind::Infrastructure, err.to_string(), None),
    }
}

/// Request handler shared by all platforms.
pub struct AuthHandler {
    provider: Arc<dyn IdentityProvider>,
    tenant: Arc<TenantConfig>,
    reject_missing_credentials: bool,
}

impl AuthHandler {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        tenant: Arc<TenantConfig>,
        reject_missing_credentials: bool,
    ) -> Self {
        Self {
            provider,
            tenant,
            reject_missing_credentials,
        }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Authenticate with the credentials in `body`.
    #[instrument(skip_all, fields(request_id = %request_id, flow = tracing::field::Empty))]
    pub async fn handle(&self, body: &[u8], request_id: &str) -> HandlerResponse {
        let started = Instant::now();
        let (flow_label, response) = self.authenticate(body, request_id).await;
        metrics::record_request(
            flow_label,
            response.status.as_u16(),
            started.elapsed().as_secs_f64(),
        );
        response
    }

    async fn authenticate(&self, body: &[u8], request_id: &str) -> (&'static str, HandlerResponse) {
        let input: CredentialInput = match serde_json::from_slice(body) {
            Ok(input) => input,
            Err(e) => {
                warn!(error = %e, "rejecting malformed request body");
                return (
                    "none",
                    HandlerResponse::error(ErrorKind::InvalidRequest, &e.to_string(), request_id, None),
                );
            }
        };

        let flow = input.select_flow();
        let flow_label = flow.as_ref().map_or("none", |f| f.label());
        Span::current().record("flow", flow_label);

        if flow.is_none() && self.reject_missing_credentials {
            warn!("no username/password or refresh token supplied");
            return (
                flow_label,
                HandlerResponse::error(
                    ErrorKind::MissingCredentials,
                    "request must include username and password, or refresh_token",
                    request_id,
                    None,
                ),
            );
        }

        let request = InitiateAuthRequest {
            flow,
            client_id: self.tenant.client_id.clone(),
            pool_id: self.tenant.pool_id.clone(),
        };

        let result = match self.provider.initiate_auth(&request).await {
            Ok(result) => result,
            Err(err) => {
                metrics::record_provider_error(err.kind());
                let (kind, message, code) = classify(&err);
                match kind {
                    ErrorKind::Infrastructure => error!(error = %err, "identity provider unavailable"),
                    _ => warn!(error = %err, "authentication failed"),
                }
                return (
                    flow_label,
                    HandlerResponse::error(kind, &message, request_id, code),
                );
            }
        };

        let bundle = TokenBundle::from(result);
        match serde_json::to_string(&bundle) {
            Ok(body) => {
                info!(expires_in = ?bundle.expires_in, "authentication succeeded");
                (
                    flow_label,
                    HandlerResponse {
                        status: StatusCode::OK,
                        body,
                    },
                )
            }
            Err(e) => {
                error!(error = %e, "failed to serialize token bundle");
                (
                    flow_label,
                    HandlerResponse::error(
                        ErrorKind::Internal,
                        &format!("failed to serialize response: {e}"),
                        request_id,
                        None,
                    ),
                )
            }
        }
    }
}
