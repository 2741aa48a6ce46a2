use log::*;

use crate::traits::AuthApiError;

/// Delivers one-time passwords to a phone number, typically by SMS.
#[allow(async_fn_in_trait)]
pub trait OtpSender {
    async fn send_otp(&self, phone: &str, code: &str) -> Result<(), AuthApiError>;
}

/// Writes codes to the log instead of sending them. Only suitable for development.
#[derive(Debug, Clone, Default)]
pub struct LogOtpSender;

impl OtpSender for LogOtpSender {
    async fn send_otp(&self, phone: &str, code: &str) -> Result<(), AuthApiError> {
        debug!("📱️ One-time password for {phone} is {code}");
        Ok(())
    }
}
