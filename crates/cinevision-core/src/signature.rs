//! Webhook signature verification
//!
//! Incoming payment webhooks carry an HMAC-SHA256 over the raw body in an
//! `X-Webhook-Signature: v1=<hex>` header, plus a unix timestamp inside the
//! payload. Verification runs over the raw bytes before any deserialization.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
const SIGNATURE_VERSION_PREFIX: &str = "v1=";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing signature header")]
    MissingHeader,
    #[error("Malformed signature header, expected 'v1=<hex>'")]
    MalformedHeader,
    #[error("Signature mismatch")]
    Mismatch,
    #[error("Timestamp {declared} outside tolerance of {tolerance_secs}s")]
    StaleTimestamp { declared: i64, tolerance_secs: i64 },
    #[error("Invalid signing secret")]
    InvalidSecret,
}

/// Verifies webhook signatures against a shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Compute the `v1=<hex>` header value for a body. Used by tests and by
    /// any outbound signing we do.
    pub fn sign(&self, body: &[u8]) -> Result<String, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(body);
        Ok(format!(
            "{}{}",
            SIGNATURE_VERSION_PREFIX,
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    /// Verify the header against the raw body. Comparison is constant-time
    /// over the decoded digests.
    pub fn verify(&self, body: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::MissingHeader)?;
        let hex_sig = header
            .strip_prefix(SIGNATURE_VERSION_PREFIX)
            .ok_or(SignatureError::MalformedHeader)?;
        let declared = hex::decode(hex_sig).map_err(|_| SignatureError::MalformedHeader)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(body);
        let expected = mac.finalize().into_bytes();

        if expected.ct_eq(declared.as_slice()).into() {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    /// Reject events whose declared timestamp is outside the replay window.
    pub fn check_timestamp(&self, declared: i64, now: i64) -> Result<(), SignatureError> {
        if (now - declared).abs() > self.tolerance_secs {
            return Err(SignatureError::StaleTimestamp {
                declared,
                tolerance_secs: self.tolerance_secs,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new("test-webhook-secret-0123456789", 300)
    }

    #[test]
    fn test_sign_then_verify() {
        let v = verifier();
        let body = br#"{"purchase_token":"x","status":"paid"}"#;
        let header = v.sign(body).unwrap();
        assert!(header.starts_with("v1="));
        assert!(v.verify(body, Some(&header)).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let v = verifier();
        let header = v.sign(b"original body").unwrap();
        assert_eq!(
            v.verify(b"tampered body", Some(&header)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let v = verifier();
        let body = b"payload";
        let mut header = v.sign(body).unwrap();
        // Flip the last hex digit.
        let last = header.pop().unwrap();
        header.push(if last == '0' { '1' } else { '0' });
        assert_eq!(v.verify(body, Some(&header)), Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_missing_and_malformed_headers() {
        let v = verifier();
        assert_eq!(v.verify(b"x", None), Err(SignatureError::MissingHeader));
        assert_eq!(
            v.verify(b"x", Some("deadbeef")),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            v.verify(b"x", Some("v1=not-hex")),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = WebhookVerifier::new("secret-a-0123456789abcdef", 300)
            .sign(b"body")
            .unwrap();
        let other = WebhookVerifier::new("secret-b-0123456789abcdef", 300);
        assert_eq!(
            other.verify(b"body", Some(&header)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_timestamp_window() {
        let v = verifier();
        let now = 1_700_000_000;
        assert!(v.check_timestamp(now, now).is_ok());
        assert!(v.check_timestamp(now - 299, now).is_ok());
        assert!(v.check_timestamp(now + 299, now).is_ok());
        assert_eq!(
            v.check_timestamp(now - 301, now),
            Err(SignatureError::StaleTimestamp {
                declared: now - 301,
                tolerance_secs: 300
            })
        );
    }
}
