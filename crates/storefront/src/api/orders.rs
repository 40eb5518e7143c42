//! Order endpoints: creation, history, cancellation.

use tracing::instrument;
use uuid::Uuid;

use allblackery_core::OrderId;

use super::types::{CreateOrder, Order};
use super::{ApiClient, ApiEnvelope, ApiError};

/// Generate a client-side idempotency key for order creation.
///
/// A retried `POST /orders` after a transport failure carries the same key,
/// so the backend can dedupe instead of double-placing.
#[must_use]
pub fn new_idempotency_key() -> String {
    format!("ord-{}", Uuid::new_v4().simple())
}

impl ApiClient {
    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when an item is no longer available and
    /// transport errors otherwise.
    #[instrument(skip(self, payload), fields(items = payload.items.len()))]
    pub async fn create_order(&self, payload: &CreateOrder) -> Result<Order, ApiError> {
        let envelope: ApiEnvelope<Order> = self.post_json("orders", payload).await?;
        envelope.into_result()
    }

    /// Fetch the authenticated user's order history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session.
    #[instrument(skip(self))]
    pub async fn get_orders(&self) -> Result<Vec<Order>, ApiError> {
        let envelope: ApiEnvelope<Vec<Order>> = self.get_json("orders").await?;
        envelope.into_result()
    }

    /// Fetch a single order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown ID.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order, ApiError> {
        let envelope: ApiEnvelope<Order> = self.get_json(&format!("orders/{order_id}")).await?;
        envelope.into_result()
    }

    /// Cancel an order that has not shipped yet.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when the order is past cancellation.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: &OrderId, reason: &str) -> Result<Order, ApiError> {
        #[derive(serde::Serialize)]
        struct Payload<'a> {
            reason: &'a str,
        }

        let envelope: ApiEnvelope<Order> = self
            .post_json(&format!("orders/{order_id}/cancel"), &Payload { reason })
            .await?;
        envelope.into_result()
    }
}
