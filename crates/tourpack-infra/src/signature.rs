//! Webhook payload signing.
//!
//! The signature is HMAC-SHA256 over the canonical JSON body (object keys sorted at
//! every depth, no insignificant whitespace), hex-encoded and sent as
//! `X-Signature: sha256={hex}`. The signed bytes are exactly the bytes sent.

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the `X-Signature` header value
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Rebuild `value` with object keys inserted in sorted order.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sorted(&map[key.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Serialize `value` as canonical JSON.
pub fn canonical_json(value: &Value) -> String {
    // Serializing a `Value` cannot fail: keys are strings and numbers are finite.
    serde_json::to_string(&sorted(value)).unwrap_or_default()
}

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign_payload(body: &str, secret: &str) -> Result<String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).context("Invalid signing secret")?;

    mac.update(body.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// `sha256={hex}` header value for `body`.
pub fn signature_header(body: &str, secret: &str) -> Result<String> {
    Ok(format!("{}{}", SIGNATURE_PREFIX, sign_payload(body, secret)?))
}

/// Verify a received signature in constant time.
///
/// The `sha256=` prefix is optional. A missing secret or an empty signature never
/// verifies.
pub fn verify_signature(body: &str, signature: &str, secret: Option<&str>) -> bool {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return false;
    };
    let provided = signature.strip_prefix(SIGNATURE_PREFIX).unwrap_or(signature);
    if provided.is_empty() {
        return false;
    }
    match sign_payload(body, secret) {
        Ok(expected) => expected.as_bytes().ct_eq(provided.as_bytes()).into(),
        Err(_) => false,
    }
}
