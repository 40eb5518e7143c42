//! Cart endpoints. Never cached - the cart is mutable state.

use tracing::instrument;

use allblackery_core::CartItemId;

use super::types::{AddCartItem, Cart};
use super::{ApiClient, ApiEnvelope, ApiError};

impl ApiClient {
    /// Fetch the authenticated user's cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Cart, ApiError> {
        let envelope: ApiEnvelope<Cart> = self.get_json("cart").await?;
        envelope.into_result()
    }

    /// Add a product to the cart. Returns the updated cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when the product is out of stock.
    #[instrument(skip(self, item), fields(product_id = %item.product_id))]
    pub async fn add_to_cart(&self, item: &AddCartItem) -> Result<Cart, ApiError> {
        let envelope: ApiEnvelope<Cart> = self.post_json("cart/add", item).await?;
        envelope.into_result()
    }

    /// Change the quantity of a cart line. Returns the updated cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown line.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update_cart_item(
        &self,
        item_id: &CartItemId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        #[derive(serde::Serialize)]
        struct Payload {
            quantity: u32,
        }

        let envelope: ApiEnvelope<Cart> = self
            .put_json(&format!("cart/items/{item_id}"), &Payload { quantity })
            .await?;
        envelope.into_result()
    }

    /// Remove a line from the cart. Returns the updated cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown line.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_cart_item(&self, item_id: &CartItemId) -> Result<Cart, ApiError> {
        let envelope: ApiEnvelope<Cart> =
            self.delete_json(&format!("cart/items/{item_id}")).await?;
        envelope.into_result()
    }
}
