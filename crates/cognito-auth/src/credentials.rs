//! AWS signing credentials
//!
//! Read from the standard `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
//! `AWS_SESSION_TOKEN` variables, which is where the Lambda runtime places
//! the execution role's temporary credentials.

use common::Secret;

use crate::error::{Error, Result};

/// Access key pair plus optional session token used for SigV4.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: Secret<String>,
    pub session_token: Option<Secret<String>>,
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: Secret::new(secret_access_key.into()),
            session_token: session_token.map(Secret::new),
        }
    }

    /// Load credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load credentials through an arbitrary key lookup. Empty values count
    /// as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());

        let access_key_id =
            get("AWS_ACCESS_KEY_ID").ok_or(Error::MissingCredentials("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key = get("AWS_SECRET_ACCESS_KEY")
            .ok_or(Error::MissingCredentials("AWS_SECRET_ACCESS_KEY"))?;

        Ok(Self::new(
            access_key_id,
            secret_access_key,
            get("AWS_SESSION_TOKEN"),
        ))
    }
}
