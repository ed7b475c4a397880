//! Cognito user-pool API constants
//!
//! Protocol identifiers for the Cognito Identity Provider service. None of
//! these are secrets.

/// SigV4 service name for the user-pool API
pub const SERVICE_NAME: &str = "cognito-idp";

/// JSON 1.1 protocol content type
pub const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// `X-Amz-Target` value selecting the AdminInitiateAuth operation
pub const ADMIN_INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.AdminInitiateAuth";

/// Regional endpoint for the user-pool API.
pub fn endpoint_for_region(region: &str) -> String {
    format!("https://cognito-idp.{region}.amazonaws.com/")
}

/// Derive the region from a user-pool id.
///
/// Pool ids are `<region>_<suffix>`, e.g. `eu-west-1_AbCdEf123`.
pub fn region_from_pool_id(pool_id: &str) -> Option<&str> {
    match pool_id.split_once('_') {
        Some((region, suffix)) if !region.is_empty() && !suffix.is_empty() => Some(region),
        _ => None,
    }
}
