//! AWS Lambda custom runtime
//!
//! Polls the runtime API for API Gateway proxy events, runs each body through
//! the auth handler and posts back an API Gateway proxy response. One
//! invocation at a time, as the runtime API requires.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::handler::{AuthHandler, HandlerResponse};

const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "lambda-runtime-aws-request-id";
const ERROR_TYPE_HEADER: &str = "lambda-runtime-function-error-type";

/// The part of an API Gateway proxy event the bridge reads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyEvent {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    is_base64_encoded: bool,
}

impl ProxyEvent {
    /// Raw request body, base64-decoded when flagged.
    fn into_body(self) -> Result<Vec<u8>> {
        let body = self.body.unwrap_or_default();
        if self.is_base64_encoded {
            STANDARD
                .decode(body.as_bytes())
                .map_err(|e| Error::InvalidEvent(format!("body is not valid base64: {e}")))
        } else {
            Ok(body.into_bytes())
        }
    }
}

/// API Gateway proxy response document
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<&'static str, &'static str>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl From<HandlerResponse> for ProxyResponse {
    fn from(response: HandlerResponse) -> Self {
        Self {
            status_code: response.status.as_u16(),
            headers: BTreeMap::from([("Content-Type", "application/json")]),
            body: response.body,
            is_base64_encoded: false,
        }
    }
}

/// Error document accepted by the runtime API's error endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeError<'a> {
    error_message: &'a str,
    error_type: &'a str,
}

/// One event received from the runtime API.
#[derive(Debug)]
pub struct Invocation {
    pub request_id: String,
    pub payload: Vec<u8>,
}

/// Client for the Lambda runtime API.
pub struct LambdaRuntime {
    client: reqwest::Client,
    base_url: String,
}

impl LambdaRuntime {
    /// `api` is the `host:port` from `AWS_LAMBDA_RUNTIME_API`.
    pub fn new(api: &str) -> Self {
        Self {
            // No timeout: the next-invocation call blocks until an event arrives
            client: reqwest::Client::new(),
            base_url: format!("http://{}/{API_VERSION}/runtime", api.trim_end_matches('/')),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api = std::env::var("AWS_LAMBDA_RUNTIME_API")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(Error::MissingRuntimeApi)?;
        Ok(Self::new(&api))
    }

    /// Block until the next event is available.
    pub async fn next_invocation(&self) -> Result<Invocation> {
        let response = self
            .client
            .get(format!("{}/invocation/next", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Runtime(format!("failed to fetch next invocation: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Runtime(format!(
                "next invocation returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::Runtime(format!("next invocation is missing {REQUEST_ID_HEADER}")))?;

        let payload = response
            .bytes()
            .await
            .map_err(|e| Error::Runtime(format!("failed to read invocation payload: {e}")))?
            .to_vec();

        Ok(Invocation {
            request_id,
            payload,
        })
    }

    pub async fn send_response(&self, request_id: &str, response: &ProxyResponse) -> Result<()> {
        let url = format!("{}/invocation/{request_id}/response", self.base_url);
        self.post_json(&url, response, None).await
    }

    /// Report an invocation that could not be handled at all.
    pub async fn send_invocation_error(
        &self,
        request_id: &str,
        error_type: &str,
        message: &str,
    ) -> Result<()> {
        let url = format!("{}/invocation/{request_id}/error", self.base_url);
        let body = RuntimeError {
            error_message: message,
            error_type,
        };
        self.post_json(&url, &body, Some(error_type)).await
    }

    /// Report a failure before the first invocation was fetched.
    pub async fn send_init_error(&self, error_type: &str, message: &str) -> Result<()> {
        let url = format!("{}/init/error", self.base_url);
        let body = RuntimeError {
            error_message: message,
            error_type,
        };
        self.post_json(&url, &body, Some(error_type)).await
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        error_type: Option<&str>,
    ) -> Result<()> {
        let mut request = self.client.post(url).json(body);
        if let Some(error_type) = error_type {
            request = request.header(ERROR_TYPE_HEADER, error_type);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::Runtime(format!("POST {url} failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Runtime(format!(
                "POST {url} returned HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }

    /// Fetch, handle and answer one invocation.
    #[instrument(skip_all)]
    pub async fn process_next(&self, handler: &AuthHandler) -> Result<()> {
        let invocation = self.next_invocation().await?;
        let request_id = invocation.request_id;

        let body = match serde_json::from_slice::<ProxyEvent>(&invocation.payload)
            .map_err(|e| Error::InvalidEvent(e.to_string()))
            .and_then(ProxyEvent::into_body)
        {
            Ok(body) => body,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "rejecting invocation");
                return self
                    .send_invocation_error(&request_id, "Runtime.InvalidEvent", &e.to_string())
                    .await;
            }
        };

        let response = handler.handle(&body, &request_id).await;
        self.send_response(&request_id, &ProxyResponse::from(response))
            .await
    }

    /// Serve invocations until the runtime API becomes unreachable.
    pub async fn run(&self, handler: &AuthHandler) -> Result<()> {
        info!(runtime_api = %self.base_url, "Lambda runtime loop started");
        loop {
            if let Err(e) = self.process_next(handler).await {
                error!(error = %e, "Lambda runtime loop stopped");
                return Err(e);
            }
        }
    }
}
