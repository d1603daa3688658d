// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification primitives.
//!
//! Meta-family platforms sign the raw request body with
//! `X-Hub-Signature-256: sha256=<hex hmac-sha256(app_secret, body)>`.
//! Telegram instead echoes a pre-shared secret token header verbatim.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify a `sha256=<hex>` HMAC signature over the raw payload.
///
/// The comparison goes through `Mac::verify_slice`, which is constant-time.
pub fn verify_sha256_hex(secret: &str, payload: &[u8], signature: &str) -> bool {
    let hex_digest = signature.strip_prefix("sha256=").unwrap_or(signature);
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Verify a pre-shared secret token echoed back in a header.
pub fn verify_secret_token(secret: &str, token: &str) -> bool {
    // HMAC both sides so the comparison is constant-time and length-blind.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(token.as_bytes());
    let token_tag = mac.finalize().into_bytes();

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(secret.as_bytes());
    mac.verify_slice(&token_tag).is_ok()
}

/// Produce a `sha256=<hex>` signature for the payload (used in tests and by
/// fakes standing in for the providers).
pub fn sign_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("hmac accepts any key length");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
