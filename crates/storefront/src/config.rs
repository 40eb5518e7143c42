//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ALLBLACKERY_API_BASE_URL` - Base URL of the AllBlackery REST API
//!   (e.g. `https://api.allblackery.com/api`)
//! - `STRIPE_PUBLISHABLE_KEY` - Stripe publishable key (`pk_live_...` /
//!   `pk_test_...`)
//!
//! ## Optional
//! - `ALLBLACKERY_API_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `ALLBLACKERY_CURRENCY` - Store currency code (default: USD)
//! - `ALLBLACKERY_OTP_EXPIRY_SECS` - Fallback OTP validity window used when
//!   the server response omits one (default: 300)

use std::time::Duration;

use thiserror::Error;
use url::Url;

use allblackery_core::CurrencyCode;

const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
const DEFAULT_OTP_EXPIRY_SECS: u32 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the AllBlackery REST API.
    pub api_base_url: Url,
    /// Per-request timeout.
    pub api_timeout: Duration,
    /// Stripe publishable key. Publishable keys are safe to expose
    /// client-side; secret keys (`sk_...`) are rejected at load.
    pub stripe_publishable_key: String,
    /// Store currency.
    pub currency: CurrencyCode,
    /// Fallback OTP validity window when the server omits `expiresIn`.
    pub otp_expiry_secs: u32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if a Stripe secret key is supplied where a publishable key is
    /// expected.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_required_env("ALLBLACKERY_API_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ALLBLACKERY_API_BASE_URL".to_string(), e.to_string())
            })?;

        let api_timeout_secs = get_env_or_default(
            "ALLBLACKERY_API_TIMEOUT_SECS",
            &DEFAULT_API_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("ALLBLACKERY_API_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        let stripe_publishable_key = get_required_env("STRIPE_PUBLISHABLE_KEY")?;
        validate_publishable_key(&stripe_publishable_key, "STRIPE_PUBLISHABLE_KEY")?;

        let currency = match get_env_or_default("ALLBLACKERY_CURRENCY", "USD").as_str() {
            "USD" => CurrencyCode::Usd,
            "EUR" => CurrencyCode::Eur,
            "GBP" => CurrencyCode::Gbp,
            "CAD" => CurrencyCode::Cad,
            "AUD" => CurrencyCode::Aud,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "ALLBLACKERY_CURRENCY".to_string(),
                    format!("unsupported currency code: {other}"),
                ));
            }
        };

        let otp_expiry_secs = get_env_or_default(
            "ALLBLACKERY_OTP_EXPIRY_SECS",
            &DEFAULT_OTP_EXPIRY_SECS.to_string(),
        )
        .parse::<u32>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("ALLBLACKERY_OTP_EXPIRY_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_base_url,
            api_timeout: Duration::from_secs(api_timeout_secs),
            stripe_publishable_key,
            currency,
            otp_expiry_secs,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a Stripe key is publishable, not secret.
///
/// A secret key in client configuration is a credential leak, so the check
/// is strict: the value must start with `pk_`.
fn validate_publishable_key(key: &str, var_name: &str) -> Result<(), ConfigError> {
    if key.starts_with("sk_") || key.starts_with("rk_") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "expected a publishable key (pk_...), got a secret key".to_string(),
        ));
    }
    if !key.starts_with("pk_") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "expected a publishable key starting with pk_".to_string(),
        ));
    }
    Ok(())
}
