//! HMAC-SHA256 payload signing.
//!
//! The signature covers `{timestamp}.{body}` to prevent replay attacks and
//! is sent hex-encoded alongside the timestamp, so receivers can verify
//! both integrity and freshness.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex-encoded HMAC-SHA256 signature for a payload.
pub fn compute_signature(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");

    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);

    hex::encode(mac.finalize().into_bytes())
}

/// Verify a signature using constant-time comparison.
pub fn verify_signature(expected_hex: &str, secret: &str, timestamp: &str, body: &[u8]) -> bool {
    let computed = compute_signature(secret, timestamp, body);
    constant_time_eq(expected_hex.as_bytes(), computed.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}
