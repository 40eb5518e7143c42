//! Wishlist endpoints. Never cached - the wishlist is mutable state.

use tracing::instrument;

use allblackery_core::{ProductId, WishlistItemId};

use super::types::Wishlist;
use super::{ApiClient, ApiEnvelope, ApiError};

impl ApiClient {
    /// Fetch the authenticated user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session.
    #[instrument(skip(self))]
    pub async fn get_wishlist(&self) -> Result<Wishlist, ApiError> {
        let envelope: ApiEnvelope<Wishlist> = self.get_json("wishlist").await?;
        envelope.into_result()
    }

    /// Save a product to the wishlist. Returns the updated wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when the product is already saved.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_wishlist(&self, product_id: &ProductId) -> Result<Wishlist, ApiError> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload<'a> {
            product_id: &'a ProductId,
        }

        let envelope: ApiEnvelope<Wishlist> = self
            .post_json("wishlist/add", &Payload { product_id })
            .await?;
        envelope.into_result()
    }

    /// Remove an entry from the wishlist. Returns the updated wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown entry.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_wishlist_item(
        &self,
        item_id: &WishlistItemId,
    ) -> Result<Wishlist, ApiError> {
        let envelope: ApiEnvelope<Wishlist> = self
            .delete_json(&format!("wishlist/items/{item_id}"))
            .await?;
        envelope.into_result()
    }

    /// Empty the wishlist. Returns the server's acknowledgement message.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session.
    #[instrument(skip(self))]
    pub async fn clear_wishlist(&self) -> Result<String, ApiError> {
        let envelope: ApiEnvelope<serde_json::Value> = self.delete_json("wishlist").await?;
        envelope.into_ack()
    }
}
