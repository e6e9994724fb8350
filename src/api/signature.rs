use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;

const MAX_CLOCK_SKEW_SECS: u64 = 300;
const MAX_FUTURE_SKEW_SECS: u64 = 60;

/// Checks `X-Relay-Signature` on a workflow callback against the shared
/// secret, rejecting stale timestamps.
pub fn verify_callback_signature(
    request_body: &str,
    timestamp: &str,
    signature: &str,
    signing_secret: &str,
) -> bool {
    let Ok(ts) = timestamp.parse::<u64>() else {
        error!("Callback timestamp is not a number");
        return false;
    };
    let Ok(now) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return false;
    };
    let now_secs = now.as_secs();
    if now_secs.saturating_sub(ts) > MAX_CLOCK_SKEW_SECS || ts > now_secs + MAX_FUTURE_SKEW_SECS {
        error!("Timestamp out of range, potential replay attack");
        return false;
    }

    let Some(received) = signature.strip_prefix("sha256=") else {
        error!("Callback signature has no sha256= prefix");
        return false;
    };
    let Ok(received_bytes) = hex::decode(received) else {
        error!("Callback signature is not hex");
        return false;
    };

    let mut mac = match Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            error!("Failed to create HMAC: {}", e);
            return false;
        }
    };
    mac.update(format!("{timestamp}:{request_body}").as_bytes());
    if mac.verify_slice(&received_bytes).is_ok() {
        true
    } else {
        error!("Callback signature verification failed");
        false
    }
}

/// `sha256=<hex>` HMAC over `timestamp:body`, as the workflow sends it.
#[must_use]
pub fn compute_signature(timestamp: &str, request_body: &str, signing_secret: &str) -> Option<String> {
    let mut mac = match Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            error!("Failed to create HMAC: {}", e);
            return None;
        }
    };
    mac.update(format!("{timestamp}:{request_body}").as_bytes());
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}
