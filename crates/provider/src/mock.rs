//! Mock identity provider for tests and local development.
//!
//! Returns a scripted outcome for every call and records what it was asked,
//! so handler tests can assert on the exact flow and parameters without a
//! network round trip.

use crate::{AuthenticationResult, IdentityProvider, InitiateAuthRequest, ProviderError};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use tracing::debug;

/// Snapshot of one `initiate_auth` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Provider flow name, `None` when no flow was selected
    pub flow: Option<&'static str>,
    /// Flow parameters, `None` when no flow was selected
    pub parameters: Option<BTreeMap<String, String>>,
    pub client_id: String,
    pub pool_id: String,
}

/// Provider that answers every request with the same outcome.
pub struct MockProvider {
    outcome: crate::Result<AuthenticationResult>,
    calls: Mutex<Vec<RecordedRequest>>,
}

impl MockProvider {
    /// Mock that always authenticates successfully with `result`.
    pub fn succeeding(result: AuthenticationResult) -> Self {
        Self {
            outcome: Ok(result),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Mock that always fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            outcome: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in call order.
    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl IdentityProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn initiate_auth<'a>(
        &'a self,
        request: &'a InitiateAuthRequest,
    ) -> Pin<Box<dyn Future<Output = crate::Result<AuthenticationResult>> + Send + 'a>> {
        let recorded = RecordedRequest {
            flow: request.flow.as_ref().map(|f| f.name()),
            parameters: request.flow.as_ref().map(|f| {
                f.parameters()
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            }),
            client_id: request.client_id.clone(),
            pool_id: request.pool_id.clone(),
        };
        debug!(flow = ?recorded.flow, "mock provider received initiate_auth");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(recorded);
        }

        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}
