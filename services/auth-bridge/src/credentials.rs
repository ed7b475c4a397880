//! Inbound credential payload and flow selection

use common::Secret;
use provider::AuthFlow;
use serde::Deserialize;

/// Credentials as posted by the client. Every field is optional; which ones
/// are present decides the auth flow.
///
/// Keys also match in title and upper case (`Username`, `PASSWORD`, ...).
#[derive(Debug, Default, Deserialize)]
pub struct CredentialInput {
    #[serde(default, alias = "Username", alias = "USERNAME")]
    pub username: Option<String>,
    #[serde(default, alias = "Password", alias = "PASSWORD")]
    pub password: Option<Secret<String>>,
    #[serde(
        default,
        alias = "Refresh_token",
        alias = "Refresh_Token",
        alias = "RefreshToken",
        alias = "REFRESH_TOKEN"
    )]
    pub refresh_token: Option<Secret<String>>,
}

impl CredentialInput {
    /// Pick the flow these credentials support.
    ///
    /// Username and password together win over a refresh token. Empty strings
    /// count as absent.
    pub fn select_flow(self) -> Option<AuthFlow> {
        let username = self.username.filter(|u| !u.is_empty());
        let password = self.password.filter(|p| !p.is_empty());

        if let (Some(username), Some(password)) = (username, password) {
            return Some(AuthFlow::Password { username, password });
        }

        self.refresh_token
            .filter(|t| !t.is_empty())
            .map(|refresh_token| AuthFlow::RefreshToken { refresh_token })
    }
}
