use hmac::{Hmac, Mac};
use log::trace;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn payment_mac(secret: &str, session_id: &str, transaction_id: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(session_id.as_bytes());
    mac.update(b"|");
    mac.update(transaction_id.as_bytes());
    mac
}

/// The gateway signs a completed payment with `HMAC-SHA256(session_id + "|" + transaction_id)`, keyed with the
/// merchant key secret, and hex encodes the result.
pub fn calculate_signature(secret: &str, session_id: &str, transaction_id: &str) -> String {
    let mac = payment_mac(secret, session_id, transaction_id);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a caller-supplied payment signature. The comparison is constant-time. A signature that isn't valid hex is
/// treated as a mismatch.
pub fn verify_signature(secret: &str, session_id: &str, transaction_id: &str, signature: &str) -> bool {
    let Ok(supplied) = hex::decode(signature.trim()) else {
        trace!("Payment signature is not valid hex");
        return false;
    };
    payment_mac(secret, session_id, transaction_id).verify_slice(&supplied).is_ok()
}
