//! OTP login and signup.
//!
//! There are no passwords. A user asks for a one-time password to be sent to their phone and then presents it. The
//! first successful verification for an unknown phone number signs the user up as a customer. Issuing session tokens
//! is left to the caller.
use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{NewUserAccount, UserAccount},
    helpers::{generate_otp, is_valid_phone, otp_matches},
    traits::{AccountManagement, AuthApiError, AuthManagement, OtpSender},
};

/// A code is burnt after this many incorrect attempts.
pub const MAX_OTP_ATTEMPTS: i64 = 5;
pub const DEFAULT_OTP_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub user: UserAccount,
    /// True if this verification created the account.
    pub new_user: bool,
}

pub struct AuthApi<B, S> {
    db: B,
    sender: S,
    ttl: Duration,
}

impl<B, S> Debug for AuthApi<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi (otp ttl: {}s)", self.ttl.num_seconds())
    }
}

impl<B, S> AuthApi<B, S> {
    pub fn new(db: B, sender: S) -> Self {
        Self { db, sender, ttl: Duration::seconds(DEFAULT_OTP_TTL_SECS) }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, S> AuthApi<B, S>
where
    B: AuthManagement + AccountManagement,
    S: OtpSender,
{
    /// Generates a fresh code for `phone`, replacing any outstanding one, and hands it to the [`OtpSender`].
    pub async fn request_otp(&self, phone: &str) -> Result<(), AuthApiError> {
        let phone = phone.trim();
        if !is_valid_phone(phone) {
            return Err(AuthApiError::InvalidPhone(phone.to_string()));
        }
        let code = generate_otp();
        let expires_at = Utc::now() + self.ttl;
        self.db.upsert_otp(phone, &code, expires_at).await?;
        self.sender.send_otp(phone, &code).await?;
        debug!("🔑️ One-time password issued for {phone}. Expires at {expires_at}");
        Ok(())
    }

    /// Checks a one-time password and logs the user in, signing them up if this is a new phone number.
    ///
    /// A `name` is required when signing up. Expired codes and codes that have failed [`MAX_OTP_ATTEMPTS`] times are
    /// deleted, so the user has to request a new one.
    pub async fn verify_otp(&self, phone: &str, code: &str, name: Option<&str>) -> Result<LoginOutcome, AuthApiError> {
        let phone = phone.trim();
        let record = self.db.fetch_otp(phone).await?.ok_or(AuthApiError::OtpNotRequested)?;
        if record.attempts >= MAX_OTP_ATTEMPTS {
            self.db.delete_otp(phone).await?;
            return Err(AuthApiError::TooManyAttempts);
        }
        if record.expires_at < Utc::now() {
            self.db.delete_otp(phone).await?;
            return Err(AuthApiError::OtpExpired);
        }
        if !otp_matches(&record.code, code) {
            let attempts = self.db.increment_otp_attempts(phone).await?;
            warn!("🔑️ Incorrect one-time password for {phone}. Attempt {attempts} of {MAX_OTP_ATTEMPTS}");
            if attempts >= MAX_OTP_ATTEMPTS {
                self.db.delete_otp(phone).await?;
                return Err(AuthApiError::TooManyAttempts);
            }
            return Err(AuthApiError::OtpInvalid);
        }
        let outcome = match self.db.fetch_user_by_phone(phone).await? {
            Some(user) => LoginOutcome { user, new_user: false },
            None => {
                let name = name.map(str::trim).filter(|n| !n.is_empty()).ok_or(AuthApiError::NameRequired)?;
                let user = self.db.create_user(NewUserAccount::customer(name, phone)).await?;
                info!("🔑️ New customer #{} signed up with {phone}", user.id);
                LoginOutcome { user, new_user: true }
            },
        };
        self.db.delete_otp(phone).await?;
        debug!("🔑️ User #{} ({}) logged in", outcome.user.id, outcome.user.role);
        Ok(outcome)
    }
}
