//! Top-level storefront handle.

use allblackery_core::Money;

use crate::api::types::Cart;
use crate::api::ApiClient;
use crate::config::StorefrontConfig;
use crate::services::checkout::{CheckoutWizard, OrderSummary};
use crate::services::otp::OtpSession;
use crate::services::payment::{PaymentGateway, PaymentSdk};
use crate::services::session::SessionStore;

/// Shared storefront state: configuration, the API client, and the
/// session store. A rendering layer constructs one of these at startup
/// and spawns workflows (OTP sessions, checkout wizards) off it.
pub struct Storefront {
    config: StorefrontConfig,
    api: ApiClient,
    session: SessionStore,
}

impl Storefront {
    /// Build the storefront from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: StorefrontConfig) -> crate::Result<Self> {
        let api = ApiClient::new(&config)?;
        let session = SessionStore::new(api.clone());
        Ok(Self {
            config,
            api,
            session,
        })
    }

    /// Load configuration from the environment and build the storefront.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or invalid, or
    /// the HTTP client cannot be constructed.
    pub fn from_env() -> crate::Result<Self> {
        Self::new(StorefrontConfig::from_env()?)
    }

    /// The API client. Clone-cheap if a workflow needs its own handle.
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The login session store.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    /// Start an OTP challenge session using the configured expiry
    /// fallback.
    #[must_use]
    pub fn otp_session(&self) -> OtpSession<ApiClient> {
        OtpSession::with_default_expiry(self.api.clone(), self.config.otp_expiry_secs)
    }

    /// Start a checkout from the given cart.
    ///
    /// # Errors
    ///
    /// Fails on an empty cart.
    pub fn begin_checkout(&self, cart: &Cart) -> crate::Result<CheckoutWizard> {
        Ok(CheckoutWizard::from_cart(cart)?)
    }

    /// Build a payment gateway over the given card SDK.
    pub fn payment_gateway<S: PaymentSdk>(&self, sdk: S) -> PaymentGateway<S, ApiClient> {
        PaymentGateway::new(sdk, self.api.clone())
    }

    /// The amount to charge for a summary, in the store currency.
    #[must_use]
    pub fn charge_amount(&self, summary: &OrderSummary) -> Money {
        Money::new(summary.total, self.config.currency)
    }
}
