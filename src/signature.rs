//! GitHub webhook signature verification

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

/// Header GitHub puts the body signature in
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Computes the `sha256=<hex>` value GitHub sends for `body` signed with `secret`.
pub fn compute_signature(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            error!("Could not key HMAC: {}", e);
            return None;
        }
    };
    mac.update(body);
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verifies the raw request body against the received signature header.
///
/// Fails closed: a missing secret, a missing header or any difference between
/// the expected and received header values returns `false`. The comparison is
/// done on the full header text in constant time, so a change in hex case is a
/// mismatch as well.
pub fn verify_signature(body: &[u8], secret: Option<&str>, received: Option<&str>) -> bool {
    let Some(received) = received else {
        error!("{} header missing!", SIGNATURE_HEADER);
        return false;
    };
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        error!("Webhook secret not configured on server!");
        return false;
    };

    let Some(expected) = compute_signature(secret, body) else {
        return false;
    };
    let matches: bool = expected.as_bytes().ct_eq(received.as_bytes()).into();
    if !matches {
        error!("Invalid signature. Got: {}", received);
    }
    matches
}
