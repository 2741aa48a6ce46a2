use chrono::{DateTime, Utc};

use crate::{db_types::OtpRecord, traits::AuthApiError};

/// Storage for one-time passwords. There is at most one live code per phone number.
#[allow(async_fn_in_trait)]
pub trait AuthManagement {
    /// Stores a new code for the phone number, replacing any previous one and resetting the attempt counter.
    async fn upsert_otp(&self, phone: &str, code: &str, expires_at: DateTime<Utc>) -> Result<(), AuthApiError>;

    async fn fetch_otp(&self, phone: &str) -> Result<Option<OtpRecord>, AuthApiError>;

    /// Records a failed attempt and returns the new attempt count.
    async fn increment_otp_attempts(&self, phone: &str) -> Result<i64, AuthApiError>;

    async fn delete_otp(&self, phone: &str) -> Result<(), AuthApiError>;
}
