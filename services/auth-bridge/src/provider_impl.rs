//! Cognito-backed identity provider.
//!
//! Adapts `cognito_auth::CognitoClient` to the `IdentityProvider` trait and
//! folds the client's errors into `ProviderError`.

use cognito_auth::{AdminInitiateAuthRequest, AwsCredentials, ClientConfig, CognitoClient};
use provider::{
    AuthFlow, AuthenticationResult, IdentityProvider, InitiateAuthRequest, ProviderError,
};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;

/// `IdentityProvider` backed by Cognito `AdminInitiateAuth`.
pub struct CognitoProvider {
    client: CognitoClient,
}

impl CognitoProvider {
    pub fn new(client: CognitoClient) -> Self {
        Self { client }
    }

    /// Build the client from validated configuration and the process's AWS
    /// credentials.
    ///
    /// Missing credentials are not fatal here; each request then fails as an
    /// infrastructure error.
    pub fn from_config(config: &Config) -> cognito_auth::Result<Self> {
        let region = config
            .region()
            .ok_or_else(|| cognito_auth::Error::InvalidRequest("no Cognito region configured".into()))?;

        let credentials = match AwsCredentials::from_env() {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                warn!(error = %e, "AWS credentials unavailable, requests will fail");
                None
            }
        };

        let client = CognitoClient::new(
            ClientConfig {
                region,
                endpoint: config.cognito.endpoint.clone(),
                timeout: Duration::from_secs(config.cognito.timeout_secs),
            },
            credentials,
        )?;
        info!(
            region = %client.region(),
            endpoint = %client.endpoint(),
            "Cognito client ready"
        );
        Ok(Self::new(client))
    }
}

impl IdentityProvider for CognitoProvider {
    fn id(&self) -> &str {
        "cognito"
    }

    fn initiate_auth<'a>(
        &'a self,
        request: &'a InitiateAuthRequest,
    ) -> Pin<Box<dyn Future<Output = provider::Result<AuthenticationResult>> + Send + 'a>> {
        Box::pin(async move {
            let wire = AdminInitiateAuthRequest {
                auth_flow: request.flow.as_ref().map(AuthFlow::name),
                auth_parameters: request.flow.as_ref().map(AuthFlow::parameters),
                client_id: &request.client_id,
                user_pool_id: &request.pool_id,
            };

            self.client
                .admin_initiate_auth(&wire)
                .await
                .map(into_result)
                .map_err(into_provider_error)
        })
    }
}

fn into_result(result: cognito_auth::AuthenticationResult) -> AuthenticationResult {
    AuthenticationResult {
        access_token: result.access_token,
        id_token: result.id_token,
        refresh_token: result.refresh_token,
        expires_in: result.expires_in,
        token_type: result.token_type,
    }
}

/// Service-side refusals stay `Rejected`; everything that kept the call
/// from completing is `Unavailable`.
fn into_provider_error(err: cognito_auth::Error) -> ProviderError {
    match err {
        cognito_auth::Error::Api { code, message } => ProviderError::Rejected { code, message },
        cognito_auth::Error::Challenge(name) => ProviderError::ChallengeRequired(name),
        other @ (cognito_auth::Error::Http(_)
        | cognito_auth::Error::MissingCredentials(_)
        | cognito_auth::Error::InvalidRequest(_)
        | cognito_auth::Error::InvalidResponse(_)) => ProviderError::Unavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::StatusCode;
    use crate::config::TenantConfig;
    use crate::handler::AuthHandler;
    use common::Secret;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// Fake Cognito endpoint answering every call with `status` and `body`,
    /// recording the decoded request bodies.
    async fn start_fake_cognito(
        status: StatusCode,
        body: &'static str,
    ) -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        tokio::spawn(async move {
            let app = axum::Router::new().fallback(move |request_body: Bytes| {
                let sink = sink.clone();
                async move {
                    sink.lock()
                        .unwrap()
                        .push(serde_json::from_slice(&request_body).unwrap());
                    (
                        status,
                        [("content-type", "application/x-amz-json-1.1")],
                        body,
                    )
                }
            });
            axum::serve(listener, app).await.unwrap();
        });

        (url, seen)
    }

    fn provider_for(endpoint: &str) -> CognitoProvider {
        let client = CognitoClient::new(
            ClientConfig {
                region: "us-east-1".into(),
                endpoint: Some(endpoint.into()),
                timeout: Duration::from_secs(5),
            },
            Some(AwsCredentials::new("AKID", "secret", None)),
        )
        .unwrap();
        CognitoProvider::new(client)
    }

    fn password_request() -> InitiateAuthRequest {
        InitiateAuthRequest {
            flow: Some(AuthFlow::Password {
                username: "alice".into(),
                password: Secret::new("pw".into()),
            }),
            client_id: "client-1".into(),
            pool_id: "us-east-1_pool".into(),
        }
    }

    #[tokio::test]
    async fn success_maps_tokens() {
        let (url, seen) = start_fake_cognito(
            StatusCode::OK,
            r#"{"AuthenticationResult":{"AccessToken":"at","IdToken":"it","RefreshToken":"rt","ExpiresIn":3600,"TokenType":"Bearer"}}"#,
        )
        .await;
        let provider = provider_for(&url);

        let result = provider.initiate_auth(&password_request()).await.unwrap();

        assert_eq!(
            result,
            AuthenticationResult {
                access_token: Some("at".into()),
                id_token: Some("it".into()),
                refresh_token: Some("rt".into()),
                expires_in: Some(3600),
                token_type: Some("Bearer".into()),
            }
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0]["AuthFlow"], "ADMIN_NO_SRP_AUTH");
        assert_eq!(seen[0]["AuthParameters"]["USERNAME"], "alice");
        assert_eq!(seen[0]["AuthParameters"]["PASSWORD"], "pw");
        assert_eq!(seen[0]["ClientId"], "client-1");
        assert_eq!(seen[0]["UserPoolId"], "us-east-1_pool");
    }

    #[tokio::test]
    async fn service_error_becomes_rejected() {
        let (url, _seen) = start_fake_cognito(
            StatusCode::BAD_REQUEST,
            r#"{"__type":"NotAuthorizedException","message":"Incorrect username or password."}"#,
        )
        .await;
        let provider = provider_for(&url);

        let err = provider
            .initiate_auth(&password_request())
            .await
            .unwrap_err();

        match err {
            ProviderError::Rejected { code, message } => {
                assert_eq!(code, "NotAuthorizedException");
                assert_eq!(message, "Incorrect username or password.");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_flow_is_passed_through() {
        let (url, seen) = start_fake_cognito(
            StatusCode::BAD_REQUEST,
            r#"{"__type":"InvalidParameterException","message":"1 validation error detected"}"#,
        )
        .await;
        let provider = provider_for(&url);
        let request = InitiateAuthRequest {
            flow: None,
            ..password_request()
        };

        let err = provider.initiate_auth(&request).await.unwrap_err();

        assert!(matches!(err, ProviderError::Rejected { ref code, .. } if code == "InvalidParameterException"));
        let seen = seen.lock().unwrap();
        assert!(seen[0].get("AuthFlow").is_none());
    }

    #[test]
    fn client_errors_map_to_provider_errors() {
        assert!(matches!(
            into_provider_error(cognito_auth::Error::Challenge("MFA_SETUP".into())),
            ProviderError::ChallengeRequired(ref name) if name == "MFA_SETUP"
        ));
        assert!(matches!(
            into_provider_error(cognito_auth::Error::Http("connection refused".into())),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            into_provider_error(cognito_auth::Error::MissingCredentials("AWS_ACCESS_KEY_ID")),
            ProviderError::Unavailable(ref msg) if msg.contains("AWS_ACCESS_KEY_ID")
        ));
        assert!(matches!(
            into_provider_error(cognito_auth::Error::InvalidResponse("empty".into())),
            ProviderError::Unavailable(_)
        ));
    }

    fn handler_for(provider: CognitoProvider) -> AuthHandler {
        AuthHandler::new(
            Arc::new(provider),
            Arc::new(TenantConfig {
                client_id: "client-1".into(),
                pool_id: "us-east-1_pool".into(),
            }),
            true,
        )
    }

    #[tokio::test]
    async fn unreachable_endpoint_answers_400() {
        let handler = handler_for(provider_for("http://127.0.0.1:1/"));

        let response = handler
            .handle(br#"{"username":"alice","password":"pw"}"#, "req_unreachable")
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["error"]["type"], "infrastructure_error");
        assert_eq!(body["error"]["request_id"], "req_unreachable");
    }

    #[tokio::test]
    async fn missing_aws_credentials_answer_400() {
        let client = CognitoClient::new(
            ClientConfig {
                region: "us-east-1".into(),
                endpoint: Some("http://127.0.0.1:1/".into()),
                timeout: Duration::from_secs(5),
            },
            None,
        )
        .unwrap();
        let handler = handler_for(CognitoProvider::new(client));

        let response = handler
            .handle(br#"{"refresh_token":"rt"}"#, "req_nocreds")
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["error"]["type"], "infrastructure_error");
    }

    #[test]
    fn provider_id_is_cognito() {
        assert_eq!(provider_for("http://127.0.0.1:1/").id(), "cognito");
    }
}
