//! Notification endpoints. Read state is per-user, so nothing here is
//! cached.

use tracing::instrument;

use allblackery_core::NotificationId;

use super::types::{Notification, NotificationFilters, NotificationPage};
use super::{ApiClient, ApiEnvelope, ApiError};

impl ApiClient {
    /// Fetch a page of the user's notifications.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session.
    #[instrument(skip(self, filters))]
    pub async fn get_notifications(
        &self,
        filters: &NotificationFilters,
    ) -> Result<NotificationPage, ApiError> {
        let envelope: ApiEnvelope<NotificationPage> =
            self.get_json_query("notifications", filters).await?;
        envelope.into_result()
    }

    /// Count of unread notifications, for the bell badge.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session.
    #[instrument(skip(self))]
    pub async fn get_unread_count(&self) -> Result<u64, ApiError> {
        #[derive(serde::Deserialize)]
        struct Counted {
            count: u64,
        }

        let envelope: ApiEnvelope<Counted> = self.get_json("notifications/unread-count").await?;
        envelope.into_result().map(|counted| counted.count)
    }

    /// Mark one notification as read. Returns the updated notification.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown notification.
    #[instrument(skip(self), fields(notification_id = %id))]
    pub async fn mark_notification_read(
        &self,
        id: &NotificationId,
    ) -> Result<Notification, ApiError> {
        let envelope: ApiEnvelope<Notification> = self
            .post_json(&format!("notifications/{id}/read"), &serde_json::json!({}))
            .await?;
        envelope.into_result()
    }

    /// Mark every notification as read. Returns the server's
    /// acknowledgement message.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session.
    #[instrument(skip(self))]
    pub async fn mark_all_notifications_read(&self) -> Result<String, ApiError> {
        let envelope: ApiEnvelope<serde_json::Value> = self
            .post_json("notifications/read-all", &serde_json::json!({}))
            .await?;
        envelope.into_ack()
    }

    /// Archive a notification. Returns the updated notification.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown notification.
    #[instrument(skip(self), fields(notification_id = %id))]
    pub async fn archive_notification(
        &self,
        id: &NotificationId,
    ) -> Result<Notification, ApiError> {
        let envelope: ApiEnvelope<Notification> = self
            .post_json(
                &format!("notifications/{id}/archive"),
                &serde_json::json!({}),
            )
            .await?;
        envelope.into_result()
    }

    /// Delete a notification. Returns the server's acknowledgement message.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown notification.
    #[instrument(skip(self), fields(notification_id = %id))]
    pub async fn delete_notification(&self, id: &NotificationId) -> Result<String, ApiError> {
        let envelope: ApiEnvelope<serde_json::Value> =
            self.delete_json(&format!("notifications/{id}")).await?;
        envelope.into_ack()
    }
}
