//! Unified error handling.
//!
//! Each subsystem defines its own error enum; `StorefrontError` is the
//! aggregate a rendering layer can match on when it does not care which
//! workflow failed. All fallible APIs in this crate return `Result<T, E>` -
//! nothing here is process-fatal, and every failure is meant to be
//! re-presented to the user for another attempt.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::services::checkout::CheckoutError;
use crate::services::otp::{OtpResendError, OtpSendError, OtpVerifyError};
use crate::services::payment::PaymentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration loading failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Backend API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// OTP challenge could not be sent.
    #[error("OTP send error: {0}")]
    OtpSend(#[from] OtpSendError),

    /// OTP verification failed before reaching the server.
    #[error("OTP verify error: {0}")]
    OtpVerify(#[from] OtpVerifyError),

    /// OTP resend refused or failed.
    #[error("OTP resend error: {0}")]
    OtpResend(#[from] OtpResendError),

    /// Checkout wizard operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Payment confirmation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),
}

impl StorefrontError {
    /// Whether the failed operation never reached the server and can be
    /// retried as-is (transport failures, local validation, cooldowns).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Api(err) => err.is_transport(),
            Self::OtpSend(OtpSendError::Api(err)) => err.is_transport(),
            Self::OtpVerify(err) => matches!(
                err,
                OtpVerifyError::InvalidCode(_) | OtpVerifyError::Busy
            ),
            Self::OtpResend(err) => matches!(err, OtpResendError::Cooldown { .. }),
            Self::Checkout(err) => err.is_retryable(),
            Self::Payment(PaymentError::SdkNotReady) => true,
            _ => false,
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorefrontError::Payment(PaymentError::SdkNotReady);
        assert_eq!(
            err.to_string(),
            "Payment error: payment SDK not ready"
        );
    }

    #[test]
    fn test_cooldown_is_retryable() {
        let err = StorefrontError::OtpResend(OtpResendError::Cooldown { remaining: 42 });
        assert!(err.is_retryable());
    }

    #[test]
    fn test_sdk_not_ready_is_retryable() {
        // Recoverable by waiting for the SDK to load
        let err = StorefrontError::Payment(PaymentError::SdkNotReady);
        assert!(err.is_retryable());
    }
}
