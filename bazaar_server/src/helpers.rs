use bazaar_engine::db_types::OrderCode;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

use crate::errors::ServerError;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, data: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data);
    mac
}

/// The hex-encoded HMAC-SHA256 of `data`.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    hex::encode(mac_for(secret, data).finalize().into_bytes())
}

/// Constant-time check of a hex-encoded HMAC-SHA256 signature.
pub fn verify_hmac(secret: &str, data: &[u8], signature: &str) -> bool {
    match hex::decode(signature.trim()) {
        Ok(claimed) => mac_for(secret, data).verify_slice(&claimed).is_ok(),
        Err(e) => {
            debug!("🔐️ HMAC signature is not valid hex. {e}");
            false
        },
    }
}

pub fn parse_order_code(s: &str) -> Result<OrderCode, ServerError> {
    s.parse::<OrderCode>().map_err(|e| ServerError::InvalidRequestPath(e.to_string()))
}
