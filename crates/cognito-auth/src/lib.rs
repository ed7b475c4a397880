//! Amazon Cognito admin authentication client
//!
//! Minimal client for the one Cognito user-pool operation the bridge needs,
//! `AdminInitiateAuth`, spoken over the AWS JSON 1.1 protocol and signed
//! with Signature Version 4. This crate has no dependency on the service
//! binary and can be tested on its own.
//!
//! Call flow:
//! 1. `AwsCredentials::from_env()` reads the signing credentials
//! 2. `CognitoClient::new()` resolves the regional endpoint
//! 3. `CognitoClient::admin_initiate_auth()` signs and sends the request
//! 4. The response is decoded into an `AuthenticationResult`, a challenge
//!    error, or the service's error code and message

pub mod api;
pub mod client;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod sigv4;

pub use api::{AdminInitiateAuthRequest, AdminInitiateAuthResponse, AuthenticationResult};
pub use client::{ClientConfig, CognitoClient};
pub use constants::*;
pub use credentials::AwsCredentials;
pub use error::{Error, Result};
