//! Service-to-service request signing.
//!
//! The signed material is `"{timestamp}\n{METHOD}\n{path}\n{sha256(body)}"`,
//! keyed with HMAC-SHA256 over a shared secret. The nonce travels as a header
//! but is not covered by the signature.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_SERVICE_ID: &str = "X-Service-Id";
pub const HEADER_TIMESTAMP: &str = "X-Service-Timestamp";
pub const HEADER_NONCE: &str = "X-Service-Nonce";
pub const HEADER_SIGNATURE: &str = "X-Service-Signature";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Default tolerance between the signer's clock and the verifier's.
pub const DEFAULT_MAX_SKEW_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("Invalid signing key: {0}")]
    InvalidKey(#[from] hmac::digest::InvalidLength),
}

/// The four headers attached to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAuthHeaders {
    pub service_id: String,
    pub timestamp: i64,
    pub nonce: String,
    pub signature: String,
}

impl ServiceAuthHeaders {
    pub fn pairs(&self) -> [(&'static str, String); 4] {
        [
            (HEADER_SERVICE_ID, self.service_id.clone()),
            (HEADER_TIMESTAMP, self.timestamp.to_string()),
            (HEADER_NONCE, self.nonce.clone()),
            (HEADER_SIGNATURE, self.signature.clone()),
        ]
    }

    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        self.pairs()
            .into_iter()
            .fold(request, |request, (name, value)| request.header(name, value))
    }
}

/// Signs outbound requests as one service identity.
#[derive(Clone)]
pub struct RequestSigner {
    service_id: String,
    secret: String,
}

impl RequestSigner {
    pub fn new(service_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            secret: secret.into(),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Signs with the current time and a fresh v4 nonce.
    pub fn sign(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
    ) -> Result<ServiceAuthHeaders, SignError> {
        self.sign_with(
            method,
            path,
            body,
            chrono::Utc::now().timestamp(),
            Uuid::new_v4().to_string(),
        )
    }

    /// Deterministic for fixed inputs.
    pub fn sign_with(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        timestamp: i64,
        nonce: impl Into<String>,
    ) -> Result<ServiceAuthHeaders, SignError> {
        let canonical = canonical_string(timestamp, method, path, body);
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())?;
        mac.update(canonical.as_bytes());
        let signature = format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()));

        Ok(ServiceAuthHeaders {
            service_id: self.service_id.clone(),
            timestamp,
            nonce: nonce.into(),
            signature,
        })
    }
}

/// Lowercase hex SHA-256 of the raw body bytes.
pub fn body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

pub fn canonical_string(timestamp: i64, method: &str, path: &str, body: &[u8]) -> String {
    format!(
        "{timestamp}\n{}\n{path}\n{}",
        method.to_ascii_uppercase(),
        body_digest(body)
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Verification
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Missing header {0}")]
    MissingHeader(&'static str),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Timestamp outside the allowed window ({skew}s skew)")]
    Expired { skew: i64 },

    #[error("Unsupported signature format")]
    UnsupportedAlgorithm,

    #[error("Signature mismatch")]
    Mismatch,
}

/// Identity and freshness data of a request that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRequest {
    pub service_id: String,
    pub timestamp: i64,
    pub nonce: String,
}

/// Receiving side of [`RequestSigner`]. Replay protection by nonce is the
/// caller's concern.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    max_skew_secs: i64,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            max_skew_secs: DEFAULT_MAX_SKEW_SECS,
        }
    }

    pub fn with_max_skew(mut self, secs: i64) -> Self {
        self.max_skew_secs = secs;
        self
    }

    pub fn verify(
        &self,
        headers: &HeaderMap,
        method: &str,
        path: &str,
        body: &[u8],
    ) -> Result<VerifiedRequest, VerifyError> {
        self.verify_at(headers, method, path, body, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        headers: &HeaderMap,
        method: &str,
        path: &str,
        body: &[u8],
        now: i64,
    ) -> Result<VerifiedRequest, VerifyError> {
        let service_id = required_header(headers, HEADER_SERVICE_ID)?;
        let raw_timestamp = required_header(headers, HEADER_TIMESTAMP)?;
        let nonce = required_header(headers, HEADER_NONCE)?;
        let signature = required_header(headers, HEADER_SIGNATURE)?;

        let timestamp: i64 = raw_timestamp
            .parse()
            .map_err(|_| VerifyError::InvalidTimestamp(raw_timestamp.to_string()))?;
        let skew = (now - timestamp).abs();
        if skew > self.max_skew_secs {
            return Err(VerifyError::Expired { skew });
        }

        let expected = signature
            .strip_prefix(SIGNATURE_PREFIX)
            .and_then(|digest| hex::decode(digest).ok())
            .ok_or(VerifyError::UnsupportedAlgorithm)?;

        let canonical = canonical_string(timestamp, method, path, body);
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| VerifyError::Mismatch)?;
        mac.update(canonical.as_bytes());
        mac.verify_slice(&expected).map_err(|_| VerifyError::Mismatch)?;

        Ok(VerifiedRequest {
            service_id: service_id.to_string(),
            timestamp,
            nonce: nonce.to_string(),
        })
    }
}

fn required_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, VerifyError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(VerifyError::MissingHeader(name))
}
