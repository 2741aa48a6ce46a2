//! Payment gateway signatures.
//!
//! When a customer completes a payment, the gateway hands the client an `order_id`, a `payment_id` and a signature.
//! The signature is the hex-encoded HMAC-SHA256 of `"{order_id}|{payment_id}"`, keyed with the secret shared between
//! the gateway and this server.
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn signer(secret: &str, order_id: &str, payment_id: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac
}

/// Calculates the hex-encoded signature the gateway would send for this payment.
pub fn payment_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    hex::encode(signer(secret, order_id, payment_id).finalize().into_bytes())
}

/// Checks a claimed signature in constant time. Malformed hex is simply an invalid signature.
pub fn verify_payment_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(claimed) = hex::decode(signature.trim()) else {
        debug!("💳️ Payment signature for {order_id} is not valid hex");
        return false;
    };
    signer(secret, order_id, payment_id).verify_slice(&claimed).is_ok()
}
