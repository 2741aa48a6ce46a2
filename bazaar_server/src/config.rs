use std::env;

use bazaar_common::{parse_boolean_flag, Secret};
use bazaar_engine::api::auth_api::DEFAULT_OTP_TTL_SECS;
use chrono::Duration;
use log::*;
use rand::{distributions::Alphanumeric, Rng};

use crate::errors::ServerError;

const DEFAULT_BAZAAR_HOST: &str = "127.0.0.1";
const DEFAULT_BAZAAR_PORT: u16 = 8480;
const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;
/// HMAC-SHA256 of the raw request body, hex encoded.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Bazaar-Signature";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub payments: PaymentConfig,
    /// How long a one-time password stays valid.
    pub otp_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BAZAAR_HOST.to_string(),
            port: DEFAULT_BAZAAR_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            payments: PaymentConfig::default(),
            otp_ttl: Duration::seconds(DEFAULT_OTP_TTL_SECS),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BAZAAR_HOST").ok().unwrap_or_else(|| DEFAULT_BAZAAR_HOST.into());
        let port = env::var("BAZAAR_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BAZAAR_PORT. {e} Using the default, {DEFAULT_BAZAAR_PORT}, \
                         instead."
                    );
                    DEFAULT_BAZAAR_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BAZAAR_PORT);
        let database_url = env::var("BAZAAR_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BAZAAR_DATABASE_URL is not set. Please set it to the URL for the Bazaar database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let payments = PaymentConfig::from_env_or_defaults();
        let otp_ttl = env::var("BAZAAR_OTP_TTL_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for BAZAAR_OTP_TTL_SECS. {e}"))
                    .ok()
                    .filter(|&secs| secs > 0)
            })
            .map(Duration::seconds)
            .unwrap_or_else(|| Duration::seconds(DEFAULT_OTP_TTL_SECS));
        Self { host, port, database_url, auth, payments, otp_ttl }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 key used to sign and verify access tokens.
    pub jwt_secret: Secret<String>,
    pub token_lifetime: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT signing secret has not been set. I'm using a random value for this session. Every access \
             token will be invalid after a restart. Set BAZAAR_JWT_SECRET in production. 🚨️🚨️🚨️"
        );
        let secret = rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self { jwt_secret: Secret::new(secret), token_lifetime: Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS) }
    }
}

impl AuthConfig {
    pub fn new(jwt_secret: &str, token_lifetime: Duration) -> Self {
        Self { jwt_secret: Secret::new(jwt_secret.to_string()), token_lifetime }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("BAZAAR_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [BAZAAR_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "BAZAAR_JWT_SECRET must be at least 32 characters long".to_string(),
            ));
        }
        let hours = match env::var("BAZAAR_TOKEN_LIFETIME_HOURS") {
            Ok(s) => s.parse::<i64>().ok().filter(|&h| h > 0).ok_or_else(|| {
                ServerError::ConfigurationError(format!("Invalid BAZAAR_TOKEN_LIFETIME_HOURS: {s}"))
            })?,
            Err(_) => DEFAULT_TOKEN_LIFETIME_HOURS,
        };
        Ok(Self::new(&secret, Duration::hours(hours)))
    }
}

//-------------------------------------------------  PaymentConfig  ----------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct PaymentConfig {
    /// The secret shared with the payment gateway. Payment signatures are HMACs keyed with it.
    pub gateway_secret: Secret<String>,
    /// The key for the HMAC carried in the [`WEBHOOK_SIGNATURE_HEADER`] of gateway webhooks.
    pub webhook_secret: Secret<String>,
    /// If false, webhook signatures are not checked. **DANGER**
    pub hmac_checks: bool,
}

impl PaymentConfig {
    pub fn from_env_or_defaults() -> Self {
        let gateway_secret = env::var("BAZAAR_PAYMENT_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ BAZAAR_PAYMENT_SECRET is not set. Please set it to the key secret of your payment gateway account. \
                 Online payments cannot be verified without it."
            );
            String::default()
        });
        let webhook_secret = env::var("BAZAAR_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ BAZAAR_WEBHOOK_SECRET is not set. Payment webhooks will be rejected.");
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("BAZAAR_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Webhook HMAC checks are disabled. Anyone can mark orders as paid. Never do this in production.");
        }
        Self { gateway_secret: Secret::new(gateway_secret), webhook_secret: Secret::new(webhook_secret), hmac_checks }
    }
}
