//! Signed HTTP client for the user-pool API
//!
//! One POST per call, no retries. The service's error code and message are
//! surfaced unchanged so the caller can report them.

use chrono::Utc;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE as CONTENT_TYPE_HEADER;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::api::{
    AdminInitiateAuthRequest, AdminInitiateAuthResponse, AuthenticationResult, ErrorDocument,
    error_code,
};
use crate::constants::{ADMIN_INITIATE_AUTH_TARGET, CONTENT_TYPE, SERVICE_NAME, endpoint_for_region};
use crate::credentials::AwsCredentials;
use crate::error::{Error, Result};
use crate::sigv4::{self, SigningRequest, SigningScope};

/// Connection settings for `CognitoClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub region: String,
    /// Overrides the regional endpoint (local emulators, tests)
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

/// Client for Cognito's `AdminInitiateAuth`.
///
/// Credentials are optional at construction time; calls made without them
/// fail with `Error::MissingCredentials` instead of reaching the network.
pub struct CognitoClient {
    http: reqwest::Client,
    endpoint: Url,
    host: String,
    region: String,
    credentials: Option<AwsCredentials>,
}

impl CognitoClient {
    pub fn new(config: ClientConfig, credentials: Option<AwsCredentials>) -> Result<Self> {
        let raw = config
            .endpoint
            .clone()
            .unwrap_or_else(|| endpoint_for_region(&config.region));
        let endpoint = Url::parse(&raw)
            .map_err(|e| Error::InvalidRequest(format!("invalid endpoint {raw}: {e}")))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(Error::InvalidRequest(format!("endpoint {raw} has no host")));
            }
        };

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            host,
            region: config.region,
            credentials,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Call `AdminInitiateAuth` and return the issued tokens.
    #[instrument(skip_all, fields(flow = request.auth_flow.unwrap_or("<none>"), region = %self.region))]
    pub async fn admin_initiate_auth(
        &self,
        request: &AdminInitiateAuthRequest<'_>,
    ) -> Result<AuthenticationResult> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(Error::MissingCredentials("AWS_ACCESS_KEY_ID"))?;

        let body = serde_json::to_vec(request)
            .map_err(|e| Error::InvalidRequest(format!("failed to encode request: {e}")))?;

        let signed = sigv4::sign(
            &SigningRequest {
                method: "POST",
                path: self.endpoint.path(),
                query: self.endpoint.query().unwrap_or(""),
                headers: &[
                    ("content-type", CONTENT_TYPE),
                    ("host", self.host.as_str()),
                    ("x-amz-target", ADMIN_INITIATE_AUTH_TARGET),
                ],
                payload: &body,
            },
            &SigningScope {
                credentials,
                region: &self.region,
                service: SERVICE_NAME,
            },
            Utc::now(),
        );

        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE_HEADER, CONTENT_TYPE)
            .header("x-amz-target", ADMIN_INITIATE_AUTH_TARGET);
        for (name, value) in signed {
            builder = builder.header(name, value);
        }

        let response = builder
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("AdminInitiateAuth request failed: {e}")))?;

        let status = response.status();
        let error_type = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(|v| error_code(v).to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("failed to read AdminInitiateAuth response: {e}")))?;

        if !status.is_success() {
            let doc: ErrorDocument = serde_json::from_slice(&bytes).unwrap_or_default();
            let code = doc
                .kind
                .as_deref()
                .map(|k| error_code(k).to_string())
                .or(error_type)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            let message = doc
                .message
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            warn!(status = status.as_u16(), code = %code, "AdminInitiateAuth rejected");
            return Err(Error::Api { code, message });
        }

        let parsed: AdminInitiateAuthResponse = serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidResponse(format!("invalid AdminInitiateAuth response: {e}")))?;

        match (parsed.authentication_result, parsed.challenge_name) {
            (Some(result), _) => {
                debug!(
                    has_refresh_token = result.refresh_token.is_some(),
                    expires_in = ?result.expires_in,
                    "AdminInitiateAuth succeeded"
                );
                Ok(result)
            }
            (None, Some(challenge)) => Err(Error::Challenge(challenge)),
            (None, None) => Err(Error::InvalidResponse(
                "response has neither AuthenticationResult nor ChallengeName".into(),
            )),
        }
    }
}
