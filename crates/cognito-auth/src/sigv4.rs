//! AWS Signature Version 4 request signing
//!
//! Implements the subset of SigV4 needed for JSON-protocol POSTs: canonical
//! request over the given headers, scoped signing key, and the resulting
//! `Authorization` header. Paths are expected to be already URI-encoded and
//! the query string already canonical (the Cognito API uses `/` and no query).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::credentials::AwsCredentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// The parts of an HTTP request that participate in the signature.
#[derive(Debug)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    /// Headers to sign. `x-amz-date` and `x-amz-security-token` are added by
    /// the signer and must not be included here.
    pub headers: &'a [(&'a str, &'a str)],
    pub payload: &'a [u8],
}

/// Where and as whom the request is signed.
#[derive(Debug)]
pub struct SigningScope<'a> {
    pub credentials: &'a AwsCredentials,
    pub region: &'a str,
    pub service: &'a str,
}

/// Sign `request` at time `now`.
///
/// Returns the headers the caller must attach: `x-amz-date`, optionally
/// `x-amz-security-token`, and `authorization`.
pub fn sign(
    request: &SigningRequest<'_>,
    scope: &SigningScope<'_>,
    now: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    let mut extra = vec![("x-amz-date", amz_date.clone())];
    if let Some(token) = &scope.credentials.session_token {
        extra.push(("x-amz-security-token", token.expose().clone()));
    }

    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), normalize_value(value)))
        .chain(
            extra
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone())),
        )
        .collect();
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let (canonical, signed_headers) = canonical_request(request, &headers);
    let credential_scope = format!(
        "{date}/{}/{}/aws4_request",
        scope.region, scope.service
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{credential_scope}\n{}",
        hex::encode(Sha256::digest(canonical.as_bytes()))
    );

    let key = signing_key(
        scope.credentials.secret_access_key.expose(),
        &date,
        scope.region,
        scope.service,
    );
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
        scope.credentials.access_key_id
    );

    extra.push(("authorization", authorization));
    extra
}

/// Derive the scoped signing key: HMAC chain over date, region, service.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Build the canonical request string and the `SignedHeaders` list.
/// `headers` must already be lowercased and sorted by name.
fn canonical_request(request: &SigningRequest<'_>, headers: &[(String, String)]) -> (String, String) {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let payload_hash = hex::encode(Sha256::digest(request.payload));

    let canonical = format!(
        "{}\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        request.method, request.path, request.query
    );
    (canonical, signed_headers)
}

/// Trim and collapse runs of whitespace inside a header value.
fn normalize_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
