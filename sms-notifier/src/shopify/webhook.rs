//! Shopify webhook signature verification

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Verify `X-Shopify-Hmac-Sha256`: base64(HMAC-SHA256(secret, raw body))
pub fn verify_webhook_hmac(payload: &[u8], hmac_header: &str, secret: &str) -> Result<(), &'static str> {
    if secret.is_empty() {
        return Err("Webhook secret not configured");
    }

    let provided = STANDARD
        .decode(hmac_header.trim())
        .map_err(|_| "Invalid HMAC signature encoding")?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(payload);

    // Constant-time comparison via hmac::verify_slice
    mac.verify_slice(&provided)
        .map_err(|_| "Invalid HMAC signature")
}
