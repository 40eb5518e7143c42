//! Payment endpoints: payment intent creation.
//!
//! Client-side confirmation happens through the payment SDK, not here - see
//! [`crate::services::payment`].

use tracing::instrument;

use allblackery_core::Money;

use super::types::PaymentIntent;
use super::{ApiClient, ApiEnvelope, ApiError};

impl ApiClient {
    /// Create a payment intent for the given amount.
    ///
    /// The amount is converted to minor units here; callers pass major
    /// units (dollars).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the backend refuses the amount and
    /// transport errors otherwise.
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn create_payment_intent(&self, amount: Money) -> Result<PaymentIntent, ApiError> {
        #[derive(serde::Serialize)]
        struct Payload<'a> {
            /// Minor units (cents).
            amount: i64,
            currency: &'a str,
        }

        let minor = amount.to_minor_units().ok_or_else(|| {
            ApiError::Rejected(format!("amount out of range: {amount}"))
        })?;
        let currency = amount.currency.code().to_ascii_lowercase();

        let envelope: ApiEnvelope<PaymentIntent> = self
            .post_json(
                "payments/create-intent",
                &Payload {
                    amount: minor,
                    currency: &currency,
                },
            )
            .await?;
        envelope.into_result()
    }
}
