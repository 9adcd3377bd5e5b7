//! Webhook signature verification.
//!
//! Stripe signs each delivery with `HMAC-SHA256(secret, "{timestamp}.{raw body}")` and sends the
//! result in the `Stripe-Signature` header as `t=<unix>,v1=<hex>`. Verification recomputes the
//! digest over the raw bytes and compares in constant time, and rejects timestamps outside the
//! tolerance window to stop replays.
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Stripe retries deliveries for minutes, not hours; 5 minutes of clock skew is their own
/// recommended default.
pub fn default_tolerance() -> Duration {
    Duration::minutes(5)
}

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Error)]
pub enum SignatureError {
    #[error("The signature header is malformed: {0}")]
    MalformedHeader(String),
    #[error("The signature header carries no v1 signature")]
    MissingSignature,
    #[error("The signature timestamp is outside the tolerance window")]
    TimestampOutOfTolerance,
    #[error("The signature does not match the payload")]
    Mismatch,
}

/// The hex HMAC-SHA256 digest of `"{timestamp}.{body}"`.
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Builds a signature header for a payload. Used by tests and local event injection.
pub fn build_signature_header(secret: &str, timestamp: i64, body: &[u8]) -> String {
    format!("t={timestamp},v1={}", sign_payload(secret, timestamp, body))
}

/// Verifies a `Stripe-Signature` header against the raw request body.
///
/// The header may carry multiple `v1` entries (while an endpoint secret is being rolled); the
/// payload is accepted if any of them matches.
pub fn verify_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for field in header.split(',') {
        let (key, value) =
            field.split_once('=').ok_or_else(|| SignatureError::MalformedHeader(field.to_string()))?;
        match key.trim() {
            "t" => {
                let t = value.parse::<i64>().map_err(|_| SignatureError::MalformedHeader(field.to_string()))?;
                timestamp = Some(t);
            },
            "v1" => signatures.push(value.trim()),
            // Other schemes (v0 etc.) are ignored
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or_else(|| SignatureError::MalformedHeader("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    let age = now.timestamp() - timestamp;
    if age.abs() > tolerance.num_seconds() {
        return Err(SignatureError::TimestampOutOfTolerance);
    }
    let verified = signatures.iter().any(|sig| {
        let Ok(expected) = hex::decode(sig) else { return false };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    });
    if verified {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};

    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;

    #[test]
    fn valid_signature_is_accepted() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let header = build_signature_header(SECRET, now.timestamp(), BODY);
        verify_signature(SECRET, &header, BODY, now, default_tolerance()).expect("signature rejected");
    }

    #[test]
    fn tampered_body_is_rejected() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let header = build_signature_header(SECRET, now.timestamp(), BODY);
        let err = verify_signature(SECRET, &header, b"{}", now, default_tolerance()).unwrap_err();
        assert!(matches!(err, SignatureError::Mismatch));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let header = build_signature_header("whsec_other", now.timestamp(), BODY);
        let err = verify_signature(SECRET, &header, BODY, now, default_tolerance()).unwrap_err();
        assert!(matches!(err, SignatureError::Mismatch));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let signed_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let header = build_signature_header(SECRET, signed_at.timestamp(), BODY);
        let now = signed_at + Duration::minutes(10);
        let err = verify_signature(SECRET, &header, BODY, now, default_tolerance()).unwrap_err();
        assert!(matches!(err, SignatureError::TimestampOutOfTolerance));
    }

    #[test]
    fn any_matching_v1_entry_is_enough() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let good = sign_payload(SECRET, now.timestamp(), BODY);
        let header = format!("t={},v1={},v1={good}", now.timestamp(), "0".repeat(64));
        verify_signature(SECRET, &header, BODY, now, default_tolerance()).expect("signature rejected");
    }

    #[test]
    fn missing_v1_entry_is_rejected() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let header = format!("t={}", now.timestamp());
        let err = verify_signature(SECRET, &header, BODY, now, default_tolerance()).unwrap_err();
        assert!(matches!(err, SignatureError::MissingSignature));
    }
}
