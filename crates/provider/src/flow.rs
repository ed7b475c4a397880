//! Authentication flows accepted by the identity provider

use common::Secret;
use std::collections::BTreeMap;

/// Parameter key carrying the username in the password flow
pub const USERNAME_PARAM: &str = "USERNAME";

/// Parameter key carrying the password in the password flow
pub const PASSWORD_PARAM: &str = "PASSWORD";

/// Parameter key carrying the refresh token in the refresh flow
pub const REFRESH_TOKEN_PARAM: &str = "REFRESH_TOKEN";

/// A selected authentication flow together with its parameters.
#[derive(Debug, Clone)]
pub enum AuthFlow {
    /// Server-side username/password authentication (no SRP)
    Password {
        username: String,
        password: Secret<String>,
    },
    /// Exchange a refresh token for fresh access/ID tokens
    RefreshToken { refresh_token: Secret<String> },
}

impl AuthFlow {
    /// Provider-side flow name.
    pub fn name(&self) -> &'static str {
        match self {
            AuthFlow::Password { .. } => "ADMIN_NO_SRP_AUTH",
            AuthFlow::RefreshToken { .. } => "REFRESH_TOKEN_AUTH",
        }
    }

    /// Short label for logs and metrics. Never includes credential values.
    pub fn label(&self) -> &'static str {
        match self {
            AuthFlow::Password { .. } => "password",
            AuthFlow::RefreshToken { .. } => "refresh",
        }
    }

    /// Parameter map sent to the provider. Exposes the secrets; only the
    /// wire encoder should call this.
    pub fn parameters(&self) -> BTreeMap<&'static str, &str> {
        let mut params = BTreeMap::new();
        match self {
            AuthFlow::Password { username, password } => {
                params.insert(USERNAME_PARAM, username.as_str());
                params.insert(PASSWORD_PARAM, password.expose().as_str());
            }
            AuthFlow::RefreshToken { refresh_token } => {
                params.insert(REFRESH_TOKEN_PARAM, refresh_token.expose().as_str());
            }
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_flow_parameters() {
        let flow = AuthFlow::Password {
            username: "alice".into(),
            password: Secret::new("secret".into()),
        };
        assert_eq!(flow.name(), "ADMIN_NO_SRP_AUTH");
        assert_eq!(flow.label(), "password");

        let params = flow.parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(params[USERNAME_PARAM], "alice");
        assert_eq!(params[PASSWORD_PARAM], "secret");
    }

    #[test]
    fn refresh_flow_parameters() {
        let flow = AuthFlow::RefreshToken {
            refresh_token: Secret::new("abc123".into()),
        };
        assert_eq!(flow.name(), "REFRESH_TOKEN_AUTH");
        assert_eq!(flow.label(), "refresh");

        let params = flow.parameters();
        assert_eq!(params.len(), 1);
        assert_eq!(params[REFRESH_TOKEN_PARAM], "abc123");
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let flow = AuthFlow::Password {
            username: "alice".into(),
            password: Secret::new("secret".into()),
        };
        let debug = format!("{flow:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("secret"), "password leaked: {debug}");
    }
}
