mod order_code;
mod otp;
mod payment_signature;

pub use order_code::{generate_order_code, ORDER_CODE_LENGTH};
pub use otp::{generate_otp, is_valid_phone, otp_matches, OTP_LENGTH};
pub use payment_signature::{payment_signature, verify_payment_signature};
