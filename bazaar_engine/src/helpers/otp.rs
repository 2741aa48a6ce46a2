use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

pub const OTP_LENGTH: usize = 6;
const OTP_MAC_KEY: &[u8] = b"bazaar-otp";

fn otp_mac(code: &str) -> Hmac<Sha256> {
    let mut mac = Hmac::<Sha256>::new_from_slice(OTP_MAC_KEY).expect("HMAC can take key of any size");
    mac.update(code.as_bytes());
    mac
}

/// Compares a presented one-time password with the stored one in constant time. Surrounding whitespace is ignored.
pub fn otp_matches(stored: &str, presented: &str) -> bool {
    let tag = otp_mac(stored).finalize().into_bytes();
    otp_mac(presented.trim()).verify_slice(&tag).is_ok()
}

/// A fresh six-digit one-time password. Leading zeros are kept.
pub fn generate_otp() -> String {
    let n = rand::thread_rng().gen_range(0..1_000_000u32);
    format!("{n:06}")
}

/// Phone numbers are stored as 10 to 15 digits, optionally prefixed with `+`.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}
