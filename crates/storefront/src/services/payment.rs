//! Payment confirmation.
//!
//! Bridges the backend's payment-intent endpoint and the embedded card SDK.
//! The flow is: check the SDK is loaded, create an intent for the order
//! total, hand the intent's client secret to the SDK, and map whatever the
//! SDK says into a [`PaymentConfirmation`].
//!
//! A card decline is a normal outcome, not an error: the buyer sees the
//! decline message and picks another card. Errors are reserved for cases
//! where no confirmation attempt happened at all.

use thiserror::Error;
use tracing::{debug, instrument};

use allblackery_core::{Money, PaymentIntentId, PaymentMethodId, PaymentOutcome};

use crate::api::types::PaymentIntent;
use crate::api::{ApiClient, ApiError};

/// Card SDK seam.
///
/// The production implementation wraps the embedded Stripe.js runtime;
/// tests script outcomes directly.
pub trait PaymentSdk: Send + Sync {
    /// Whether the SDK runtime has finished loading.
    fn is_ready(&self) -> bool;

    /// Confirm a card payment against an intent's client secret.
    fn confirm_card_payment(
        &self,
        client_secret: &str,
        method: &PaymentMethodId,
    ) -> impl Future<Output = Result<SdkConfirmation, SdkError>> + Send;
}

/// Seam for intent creation. [`ApiClient`] is the production
/// implementation.
pub trait IntentSource: Send + Sync {
    fn create_payment_intent(
        &self,
        amount: Money,
    ) -> impl Future<Output = Result<PaymentIntent, ApiError>> + Send;
}

impl IntentSource for ApiClient {
    async fn create_payment_intent(&self, amount: Money) -> Result<PaymentIntent, ApiError> {
        Self::create_payment_intent(self, amount).await
    }
}

/// What the SDK reports for a processed confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfirmation {
    /// The issuer wants an extra challenge (3-D Secure) before settling.
    pub requires_action: bool,
}

/// SDK-side failures.
#[derive(Debug, Error)]
pub enum SdkError {
    /// The card was declined. Carries the issuer's message verbatim.
    #[error("card declined: {message}")]
    Declined { message: String },

    /// The SDK could not reach its backend; nothing was charged.
    #[error("payment SDK transport failure: {0}")]
    Transport(String),
}

/// Errors from [`PaymentGateway::confirm`].
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The SDK runtime has not loaded; no intent was created. Recoverable
    /// by waiting and retrying.
    #[error("payment SDK not ready")]
    SdkNotReady,

    /// Creating the payment intent failed; the SDK was never invoked.
    #[error("payment intent creation failed: {0}")]
    Intent(#[from] ApiError),

    /// The SDK failed before producing a decision.
    #[error("{0}")]
    Sdk(SdkError),
}

/// Final word on one confirmation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub outcome: PaymentOutcome,
    /// Intent behind this attempt; passed along on the order so the
    /// backend can tie the charge to it.
    pub payment_intent_id: PaymentIntentId,
    /// Decline or status message for display, when there is one.
    pub message: Option<String>,
}

impl PaymentConfirmation {
    /// Whether the charge went through.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.outcome == PaymentOutcome::Succeeded
    }
}

/// Drives a card payment from order total to settled charge.
pub struct PaymentGateway<S, I> {
    sdk: S,
    intents: I,
}

impl<S: PaymentSdk, I: IntentSource> PaymentGateway<S, I> {
    pub const fn new(sdk: S, intents: I) -> Self {
        Self { sdk, intents }
    }

    /// Confirm a card payment for `amount`.
    ///
    /// Checks SDK readiness before any network call, so a half-loaded page
    /// never creates an orphan intent. Declines come back as
    /// `Ok` with [`PaymentOutcome::Failed`].
    ///
    /// # Errors
    ///
    /// - [`PaymentError::SdkNotReady`] if the SDK has not loaded
    /// - [`PaymentError::Intent`] if intent creation fails
    /// - [`PaymentError::Sdk`] if the SDK fails without a decision
    #[instrument(skip_all, fields(amount = %amount.display()))]
    pub async fn confirm(
        &self,
        amount: Money,
        method: &PaymentMethodId,
    ) -> Result<PaymentConfirmation, PaymentError> {
        if !self.sdk.is_ready() {
            return Err(PaymentError::SdkNotReady);
        }

        let intent = self.intents.create_payment_intent(amount).await?;
        debug!(intent_id = %intent.id, minor_units = intent.amount, "payment intent created");

        match self
            .sdk
            .confirm_card_payment(&intent.client_secret, method)
            .await
        {
            Ok(confirmation) => {
                let outcome = if confirmation.requires_action {
                    PaymentOutcome::RequiresAction
                } else {
                    PaymentOutcome::Succeeded
                };
                Ok(PaymentConfirmation {
                    outcome,
                    payment_intent_id: intent.id,
                    message: None,
                })
            }
            Err(SdkError::Declined { message }) => Ok(PaymentConfirmation {
                outcome: PaymentOutcome::Failed,
                payment_intent_id: intent.id,
                message: Some(message),
            }),
            Err(err) => Err(PaymentError::Sdk(err)),
        }
    }
}
