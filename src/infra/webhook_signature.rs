//! Provider webhook signatures: `t=<unix>,v1=<hex hmac-sha256>` over `"{t}.{body}"`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::app_error::AppError;
use crate::domain::entities::billing_event::BillingEvent;

type HmacSha256 = Hmac<Sha256>;

/// Maximum distance between the signed timestamp and now.
const TOLERANCE_SECS: u64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("missing signature header")]
    MissingHeader,
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("no matching signature")]
    SignatureMismatch,
    #[error("timestamp outside tolerance")]
    TimestampOutOfTolerance,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<VerificationError> for AppError {
    fn from(e: VerificationError) -> Self {
        AppError::Verification(e.to_string())
    }
}

/// Checks the signature over the exact received bytes, then decodes the event.
/// Nothing is parsed from the body before the signature matches.
pub fn verify(
    raw_body: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<BillingEvent, VerificationError> {
    if signature_header.trim().is_empty() {
        return Err(VerificationError::MissingHeader);
    }

    let (timestamp, signatures) = parse_header(signature_header)?;

    let mac = signed_mac(secret, timestamp, raw_body);
    let matched = signatures
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok());
    if !matched {
        return Err(VerificationError::SignatureMismatch);
    }

    if now.abs_diff(timestamp) > TOLERANCE_SECS {
        return Err(VerificationError::TimestampOutOfTolerance);
    }

    BillingEvent::from_json(raw_body).map_err(|e| VerificationError::InvalidPayload(e.to_string()))
}

/// Returns the timestamp and every decodable `v1` signature. Other schemes are ignored.
fn parse_header(header: &str) -> Result<(i64, Vec<Vec<u8>>), VerificationError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                let ts = value
                    .parse::<i64>()
                    .map_err(|_| VerificationError::MalformedHeader)?;
                timestamp = Some(ts);
            }
            "v1" => {
                // Undecodable hex can never match, so it is dropped here
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    match timestamp {
        Some(ts) if !signatures.is_empty() => Ok((ts, signatures)),
        _ => Err(VerificationError::MalformedHeader),
    }
}

fn signed_mac(secret: &str, timestamp: i64, body: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}

/// Builds a header the way the provider does. Used by tests and local tooling.
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mac = signed_mac(secret, timestamp, body);
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={},v1={}", timestamp, signature)
}
