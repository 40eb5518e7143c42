//! Checkout wizard.
//!
//! A four-step flow over a snapshot of the cart: Cart review, Shipping,
//! Payment, and final Review. Step movement is clamped to the valid range
//! and gated on the selections each step requires. Pricing is recomputed
//! from the snapshot on demand; nothing here talks to the network except
//! [`CheckoutWizard::place_order`].

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use allblackery_core::{OrderId, PaymentIntentId, PaymentMethodId};

use crate::api::types::{Address, Cart, CreateOrder, CreateOrderItem, Order};
use crate::api::{ApiClient, ApiError};

/// Orders over this subtotal ship free.
const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(100, 0, 0, false, 0);
/// Flat shipping fee below the threshold: 9.99.
const SHIPPING_FEE: Decimal = Decimal::from_parts(999, 0, 0, false, 2);
/// Sales tax rate: 8%.
const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);
/// Promo discount rate: 10%.
const DISCOUNT_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
/// The only promo code the backend honors, compared case-insensitively.
const PROMO_CODE: &str = "SAVE10";

/// Seam for the order-placement call so the wizard is testable without a
/// server. [`ApiClient`] is the production implementation.
pub trait OrderPlacer: Send + Sync {
    fn create_order(
        &self,
        payload: &CreateOrder,
    ) -> impl Future<Output = Result<Order, ApiError>> + Send;
}

impl OrderPlacer for ApiClient {
    async fn create_order(&self, payload: &CreateOrder) -> Result<Order, ApiError> {
        Self::create_order(self, payload).await
    }
}

/// Errors from checkout wizard operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout cannot start from an empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Cannot leave the shipping step without a selected address.
    #[error("no shipping address selected")]
    MissingAddress,

    /// Cannot leave the payment step without a selected payment method.
    #[error("no payment method selected")]
    MissingPaymentMethod,

    /// The promo code is not recognized.
    #[error("invalid promo code: {0}")]
    InvalidPromo(String),

    /// Placement was attempted before reaching the review step.
    #[error("order can only be placed from the review step")]
    NotAtReview,

    /// The order already went through; placing again would duplicate it.
    #[error("order already placed")]
    AlreadyPlaced,

    /// Placement was cancelled before a response arrived. The request may
    /// or may not have reached the server; the idempotency key makes a
    /// retry safe.
    #[error("order placement cancelled")]
    Cancelled,

    /// The placement request failed.
    #[error("{0}")]
    Api(#[from] ApiError),
}

impl CheckoutError {
    /// Whether retrying the same call can succeed without user input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Api(err) => err.is_transport(),
            Self::Cancelled => true,
            _ => false,
        }
    }
}

/// The four wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckoutStep {
    Cart,
    Shipping,
    Payment,
    Review,
}

impl CheckoutStep {
    /// Zero-based position, for progress indicators.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Display label for the step header.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cart => "Cart",
            Self::Shipping => "Shipping",
            Self::Payment => "Payment",
            Self::Review => "Review",
        }
    }

    const fn next(self) -> Self {
        match self {
            Self::Cart => Self::Shipping,
            Self::Shipping => Self::Payment,
            // Review is the last step; forward movement clamps here.
            Self::Payment | Self::Review => Self::Review,
        }
    }

    const fn previous(self) -> Self {
        match self {
            // Cart is the first step; backward movement clamps here.
            Self::Cart | Self::Shipping => Self::Cart,
            Self::Payment => Self::Shipping,
            Self::Review => Self::Payment,
        }
    }
}

/// Result of a forward step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAdvance {
    /// Moved to the given step.
    Moved(CheckoutStep),
    /// Already at Review; placing the order is the next action.
    ReadyToPlace,
}

/// Computed order pricing, all values rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Checkout flow state machine.
///
/// Holds a snapshot of the cart taken at construction; later cart edits do
/// not affect an in-progress checkout. All pricing derives from the
/// snapshot, so [`summary`](Self::summary) is pure and idempotent.
#[derive(Debug)]
pub struct CheckoutWizard {
    items: Vec<CreateOrderItem>,
    subtotal: Decimal,
    step: CheckoutStep,
    shipping_address: Option<Address>,
    payment_method: Option<PaymentMethodId>,
    promo_applied: bool,
    idempotency_key: String,
    placed: Option<OrderId>,
}

impl CheckoutWizard {
    /// Start a checkout from the current cart.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] if the cart has no items.
    pub fn from_cart(cart: &Cart) -> Result<Self, CheckoutError> {
        if cart.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let items = cart
            .items
            .iter()
            .map(|item| CreateOrderItem {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                size: item.size.clone(),
                color: item.color.clone(),
            })
            .collect();
        let subtotal = cart
            .items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum();

        Ok(Self {
            items,
            subtotal,
            step: CheckoutStep::Cart,
            shipping_address: None,
            payment_method: None,
            promo_applied: false,
            idempotency_key: crate::api::orders::new_idempotency_key(),
            placed: None,
        })
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    /// Advance one step.
    ///
    /// At Review there is nowhere further to go; the caller gets
    /// [`StepAdvance::ReadyToPlace`] instead of a silent no-op.
    ///
    /// # Errors
    ///
    /// Leaving Shipping without an address or Payment without a payment
    /// method fails and holds the current step.
    pub fn next_step(&mut self) -> Result<StepAdvance, CheckoutError> {
        match self.step {
            CheckoutStep::Shipping if self.shipping_address.is_none() => {
                return Err(CheckoutError::MissingAddress);
            }
            CheckoutStep::Payment if self.payment_method.is_none() => {
                return Err(CheckoutError::MissingPaymentMethod);
            }
            CheckoutStep::Review => return Ok(StepAdvance::ReadyToPlace),
            _ => {}
        }
        self.step = self.step.next();
        Ok(StepAdvance::Moved(self.step))
    }

    /// Go back one step. Already at Cart is a no-op.
    pub fn previous_step(&mut self) -> CheckoutStep {
        self.step = self.step.previous();
        self.step
    }

    /// Select the shipping address.
    pub fn select_address(&mut self, address: Address) {
        self.shipping_address = Some(address);
    }

    /// Select the payment method.
    pub fn select_payment_method(&mut self, method: PaymentMethodId) {
        self.payment_method = Some(method);
    }

    /// Selected shipping address, if any.
    #[must_use]
    pub const fn shipping_address(&self) -> Option<&Address> {
        self.shipping_address.as_ref()
    }

    /// Apply a promo code, compared case-insensitively.
    ///
    /// Re-applying the same code is a no-op; the discount never stacks.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidPromo`] for anything that is not
    /// the accepted code. A previously applied discount is kept.
    pub fn apply_promo(&mut self, code: &str) -> Result<(), CheckoutError> {
        if code.eq_ignore_ascii_case(PROMO_CODE) {
            self.promo_applied = true;
            Ok(())
        } else {
            Err(CheckoutError::InvalidPromo(code.to_owned()))
        }
    }

    /// Whether the promo discount is active.
    #[must_use]
    pub const fn promo_applied(&self) -> bool {
        self.promo_applied
    }

    /// Compute the order pricing.
    ///
    /// Free shipping kicks in strictly above the threshold: a subtotal of
    /// exactly 100.00 still pays the fee. Tax applies to the subtotal
    /// before discount.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        let subtotal = round_cents(self.subtotal);
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            SHIPPING_FEE
        };
        let tax = round_cents(subtotal * TAX_RATE);
        let discount = if self.promo_applied {
            round_cents(subtotal * DISCOUNT_RATE)
        } else {
            Decimal::ZERO
        };

        OrderSummary {
            subtotal,
            shipping,
            tax,
            discount,
            total: subtotal + shipping + tax - discount,
        }
    }

    /// The order this wizard placed, if it has.
    #[must_use]
    pub const fn placed_order(&self) -> Option<&OrderId> {
        self.placed.as_ref()
    }

    /// Place the order.
    ///
    /// On failure or cancellation every selection, the step, and the
    /// idempotency key are preserved, so calling again retries the same
    /// order rather than starting over.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::MissingAddress`] / [`CheckoutError::MissingPaymentMethod`]
    ///   if a required selection was never made
    /// - [`CheckoutError::NotAtReview`] before the final step
    /// - [`CheckoutError::AlreadyPlaced`] on a second successful call
    /// - [`CheckoutError::Cancelled`] if `cancel` fires first
    /// - [`CheckoutError::Api`] if the request fails
    #[instrument(skip_all, fields(items = self.items.len()))]
    pub async fn place_order<P: OrderPlacer>(
        &mut self,
        placer: &P,
        payment_intent_id: Option<PaymentIntentId>,
        cancel: &CancellationToken,
    ) -> Result<Order, CheckoutError> {
        if self.placed.is_some() {
            return Err(CheckoutError::AlreadyPlaced);
        }
        let shipping_address = self
            .shipping_address
            .clone()
            .ok_or(CheckoutError::MissingAddress)?;
        let payment_method = self
            .payment_method
            .clone()
            .ok_or(CheckoutError::MissingPaymentMethod)?;
        if self.step != CheckoutStep::Review {
            return Err(CheckoutError::NotAtReview);
        }

        let payload = CreateOrder {
            items: self.items.clone(),
            shipping_address,
            payment_method,
            payment_intent_id,
            idempotency_key: self.idempotency_key.clone(),
        };

        let order = tokio::select! {
            () = cancel.cancelled() => return Err(CheckoutError::Cancelled),
            result = placer.create_order(&payload) => result?,
        };

        debug!(order_id = %order.id, "order placed");
        self.placed = Some(order.id.clone());
        Ok(order)
    }
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use chrono::Utc;

    use allblackery_core::{AddressId, CartItemId, OrderStatus, ProductId};

    use crate::api::types::CartItem;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn cart_with_subtotal(amount: Decimal) -> Cart {
        Cart {
            items: vec![CartItem {
                id: CartItemId::new("ci_1"),
                product_id: ProductId::new("prod_1"),
                product_name: "Leather Jacket".to_string(),
                product_image: None,
                price: amount,
                quantity: 1,
                size: Some("M".to_string()),
                color: Some("black".to_string()),
            }],
            total_items: 1,
            total_amount: amount,
        }
    }

    fn test_address() -> Address {
        Address {
            id: AddressId::new("addr_1"),
            name: "Home".to_string(),
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62704".to_string(),
            country: "US".to_string(),
            phone: None,
            is_default: true,
        }
    }

    fn ready_wizard(subtotal: Decimal) -> CheckoutWizard {
        let mut wizard = CheckoutWizard::from_cart(&cart_with_subtotal(subtotal)).unwrap();
        wizard.select_address(test_address());
        wizard.select_payment_method(PaymentMethodId::new("pm_1"));
        wizard
    }

    fn wizard_at_review(subtotal: Decimal) -> CheckoutWizard {
        let mut wizard = ready_wizard(subtotal);
        while wizard.step() != CheckoutStep::Review {
            wizard.next_step().unwrap();
        }
        wizard
    }

    fn placed_order() -> Order {
        Order {
            id: OrderId::new("ord_1"),
            items: vec![],
            total_amount: Decimal::new(162_00, 2),
            status: OrderStatus::Pending,
            payment_intent_id: None,
            created_at: Utc::now(),
        }
    }

    struct OkPlacer;

    impl OrderPlacer for OkPlacer {
        async fn create_order(&self, _payload: &CreateOrder) -> Result<Order, ApiError> {
            Ok(placed_order())
        }
    }

    struct FailPlacer;

    impl OrderPlacer for FailPlacer {
        async fn create_order(&self, _payload: &CreateOrder) -> Result<Order, ApiError> {
            Err(ApiError::Rejected("Insufficient stock".to_string()))
        }
    }

    struct HangPlacer;

    impl OrderPlacer for HangPlacer {
        async fn create_order(&self, _payload: &CreateOrder) -> Result<Order, ApiError> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_empty_cart_cannot_start_checkout() {
        let cart = Cart {
            items: vec![],
            total_items: 0,
            total_amount: Decimal::ZERO,
        };
        assert!(matches!(
            CheckoutWizard::from_cart(&cart),
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[test]
    fn test_steps_clamp_at_both_ends() {
        let mut wizard = ready_wizard(Decimal::new(50_00, 2));
        assert_eq!(wizard.step(), CheckoutStep::Cart);

        // Backward from the first step stays put.
        assert_eq!(wizard.previous_step(), CheckoutStep::Cart);

        assert_eq!(
            wizard.next_step().unwrap(),
            StepAdvance::Moved(CheckoutStep::Shipping)
        );
        assert_eq!(
            wizard.next_step().unwrap(),
            StepAdvance::Moved(CheckoutStep::Payment)
        );
        assert_eq!(
            wizard.next_step().unwrap(),
            StepAdvance::Moved(CheckoutStep::Review)
        );

        // Forward from the last step signals placement instead of moving.
        assert_eq!(wizard.next_step().unwrap(), StepAdvance::ReadyToPlace);
        assert_eq!(wizard.step(), CheckoutStep::Review);
        assert_eq!(wizard.step().index(), 3);
    }

    #[test]
    fn test_shipping_step_requires_address() {
        let mut wizard = CheckoutWizard::from_cart(&cart_with_subtotal(Decimal::new(
            50_00, 2,
        )))
        .unwrap();
        wizard.next_step().unwrap();
        assert_eq!(wizard.step(), CheckoutStep::Shipping);

        assert!(matches!(
            wizard.next_step(),
            Err(CheckoutError::MissingAddress)
        ));
        assert_eq!(wizard.step(), CheckoutStep::Shipping);

        wizard.select_address(test_address());
        assert_eq!(
            wizard.next_step().unwrap(),
            StepAdvance::Moved(CheckoutStep::Payment)
        );
    }

    #[test]
    fn test_payment_step_requires_method() {
        let mut wizard = CheckoutWizard::from_cart(&cart_with_subtotal(Decimal::new(
            50_00, 2,
        )))
        .unwrap();
        wizard.select_address(test_address());
        wizard.next_step().unwrap();
        wizard.next_step().unwrap();
        assert_eq!(wizard.step(), CheckoutStep::Payment);

        assert!(matches!(
            wizard.next_step(),
            Err(CheckoutError::MissingPaymentMethod)
        ));

        wizard.select_payment_method(PaymentMethodId::new("pm_1"));
        assert_eq!(
            wizard.next_step().unwrap(),
            StepAdvance::Moved(CheckoutStep::Review)
        );
    }

    #[test]
    fn test_promo_is_case_insensitive() {
        for code in ["SAVE10", "save10", "SaVe10"] {
            let mut wizard = ready_wizard(Decimal::new(50_00, 2));
            wizard.apply_promo(code).unwrap();
            assert!(wizard.promo_applied());
        }
    }

    #[test]
    fn test_promo_rejects_unknown_codes() {
        let mut wizard = ready_wizard(Decimal::new(50_00, 2));
        for code in ["SAVE20", "SAVE10 ", "", "10SAVE"] {
            assert!(matches!(
                wizard.apply_promo(code),
                Err(CheckoutError::InvalidPromo(_))
            ));
            assert!(!wizard.promo_applied());
        }

        // A bad code after a good one does not revoke the discount.
        wizard.apply_promo("SAVE10").unwrap();
        wizard.apply_promo("SAVE20").unwrap_err();
        assert!(wizard.promo_applied());
    }

    #[test]
    fn test_summary_free_shipping_over_threshold() {
        let wizard = ready_wizard(Decimal::new(150_00, 2));
        let summary = wizard.summary();
        assert_eq!(summary.subtotal, Decimal::new(150_00, 2));
        assert_eq!(summary.shipping, Decimal::ZERO);
        assert_eq!(summary.tax, Decimal::new(12_00, 2));
        assert_eq!(summary.discount, Decimal::ZERO);
        assert_eq!(summary.total, Decimal::new(162_00, 2));
    }

    #[test]
    fn test_summary_with_shipping_and_promo() {
        let mut wizard = ready_wizard(Decimal::new(50_00, 2));
        wizard.apply_promo("save10").unwrap();
        let summary = wizard.summary();
        assert_eq!(summary.shipping, Decimal::new(9_99, 2));
        assert_eq!(summary.tax, Decimal::new(4_00, 2));
        assert_eq!(summary.discount, Decimal::new(5_00, 2));
        assert_eq!(summary.total, Decimal::new(58_99, 2));
    }

    #[test]
    fn test_summary_threshold_boundary_pays_shipping() {
        // Free shipping is strictly above 100.00.
        let wizard = ready_wizard(Decimal::new(100_00, 2));
        assert_eq!(wizard.summary().shipping, Decimal::new(9_99, 2));

        let wizard = ready_wizard(Decimal::new(100_01, 2));
        assert_eq!(wizard.summary().shipping, Decimal::ZERO);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let mut wizard = ready_wizard(Decimal::new(150_00, 2));
        wizard.apply_promo("SAVE10").unwrap();
        wizard.apply_promo("SAVE10").unwrap();
        let first = wizard.summary();
        assert_eq!(first, wizard.summary());
        // The discount never stacks.
        assert_eq!(first.discount, Decimal::new(15_00, 2));
    }

    #[tokio::test]
    async fn test_place_order_success() {
        init_tracing();
        let mut wizard = wizard_at_review(Decimal::new(150_00, 2));
        let cancel = CancellationToken::new();

        let order = wizard
            .place_order(&OkPlacer, None, &cancel)
            .await
            .unwrap();
        assert_eq!(order.id, OrderId::new("ord_1"));
        assert_eq!(wizard.placed_order(), Some(&OrderId::new("ord_1")));
    }

    #[tokio::test]
    async fn test_place_order_twice_is_refused() {
        let mut wizard = wizard_at_review(Decimal::new(150_00, 2));
        let cancel = CancellationToken::new();

        wizard.place_order(&OkPlacer, None, &cancel).await.unwrap();
        let err = wizard
            .place_order(&OkPlacer, None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::AlreadyPlaced));
    }

    #[tokio::test]
    async fn test_place_order_failure_preserves_state() {
        init_tracing();
        let mut wizard = wizard_at_review(Decimal::new(150_00, 2));
        wizard.apply_promo("SAVE10").unwrap();
        let key_before = wizard.idempotency_key.clone();
        let cancel = CancellationToken::new();

        let err = wizard
            .place_order(&FailPlacer, None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Api(_)));

        // Everything survives for a retry.
        assert_eq!(wizard.step(), CheckoutStep::Review);
        assert!(wizard.promo_applied());
        assert!(wizard.shipping_address().is_some());
        assert_eq!(wizard.idempotency_key, key_before);
        assert!(wizard.placed_order().is_none());

        // And the retry can go through.
        wizard.place_order(&OkPlacer, None, &cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_place_order_cancellation_preserves_state() {
        let mut wizard = wizard_at_review(Decimal::new(150_00, 2));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = wizard
            .place_order(&HangPlacer, None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Cancelled));
        assert!(err.is_retryable());
        assert_eq!(wizard.step(), CheckoutStep::Review);
        assert!(wizard.placed_order().is_none());
    }

    #[tokio::test]
    async fn test_place_order_requires_selections() {
        let mut wizard =
            CheckoutWizard::from_cart(&cart_with_subtotal(Decimal::new(50_00, 2))).unwrap();
        let cancel = CancellationToken::new();

        let err = wizard
            .place_order(&OkPlacer, None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::MissingAddress));
    }

    #[tokio::test]
    async fn test_place_order_requires_review_step() {
        let mut wizard = ready_wizard(Decimal::new(150_00, 2));
        assert_eq!(wizard.step(), CheckoutStep::Cart);
        let cancel = CancellationToken::new();

        let err = wizard
            .place_order(&OkPlacer, None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::NotAtReview));
    }
}
