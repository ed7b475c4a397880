//! AdminInitiateAuth wire types (AWS JSON 1.1, PascalCase members)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request document for `AdminInitiateAuth`.
///
/// `auth_flow` and `auth_parameters` are optional so that an unselected flow
/// can be passed through and rejected by the service itself. Not `Debug`:
/// the parameters carry the password or refresh token.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdminInitiateAuthRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_flow: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_parameters: Option<BTreeMap<&'a str, &'a str>>,
    pub client_id: &'a str,
    pub user_pool_id: &'a str,
}

/// Response document for `AdminInitiateAuth`.
///
/// Exactly one of `authentication_result` or `challenge_name` is set by the
/// service.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdminInitiateAuthResponse {
    #[serde(default)]
    pub authentication_result: Option<AuthenticationResult>,
    #[serde(default)]
    pub challenge_name: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
}

/// Tokens issued by the user pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Error document returned with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorDocument {
    #[serde(rename = "__type", default)]
    pub kind: Option<String>,
    #[serde(alias = "Message", default)]
    pub message: Option<String>,
}

/// Strip the optional namespace from an error type,
/// e.g. `com.amazonaws.cognito#NotAuthorizedException` → `NotAuthorizedException`.
pub(crate) fn error_code(raw: &str) -> &str {
    let raw = raw.rsplit('#').next().unwrap_or(raw);
    // The x-amzn-errortype header may append ":<uri>"
    raw.split(':').next().unwrap_or(raw).trim()
}
