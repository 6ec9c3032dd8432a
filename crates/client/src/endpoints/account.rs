//! Address book, messages, and notifications.

use gobble_core::api::{
    AddressInput, AddressView, MessageView, NotificationView, SendMessageRequest, UnreadCount,
    Updated,
};
use gobble_core::listing::{Page, PageRequest};
use gobble_core::{AccountRef, AddressId, MessageId, NotificationId};
use tracing::instrument;

use crate::client::ApiClient;
use crate::error::ClientError;

impl ApiClient {
    // =========================================================================
    // Addresses
    // =========================================================================

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn addresses(&self) -> Result<Vec<AddressView>, ClientError> {
        self.get("api/addresses").await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 400 for missing fields or
    /// coordinates out of range.
    #[instrument(skip(self, input))]
    pub async fn create_address(&self, input: &AddressInput) -> Result<AddressView, ClientError> {
        self.post("api/addresses", input).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, input))]
    pub async fn update_address(
        &self,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<AddressView, ClientError> {
        self.put(&format!("api/addresses/{id}"), input).await
    }

    /// Make an address the default. The previous default is unset.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn set_default_address(&self, id: AddressId) -> Result<AddressView, ClientError> {
        self.post_action(&format!("api/addresses/{id}/default"))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn delete_address(&self, id: AddressId) -> Result<(), ClientError> {
        self.delete(&format!("api/addresses/{id}")).await
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn inbox(&self, page: PageRequest) -> Result<Page<MessageView>, ClientError> {
        self.get_query("api/messages", &page).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn sent_messages(&self, page: PageRequest) -> Result<Page<MessageView>, ClientError> {
        self.get_query("api/messages/sent", &page).await
    }

    /// Send a message to another account. The recipient is notified.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 404 for an unknown recipient.
    #[instrument(skip(self, body))]
    pub async fn send_message(
        &self,
        recipient: AccountRef,
        subject: &str,
        body: &str,
    ) -> Result<MessageView, ClientError> {
        let request = SendMessageRequest {
            recipient,
            subject: subject.to_owned(),
            body: body.to_owned(),
        };
        self.post("api/messages", &request).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn mark_message_read(&self, id: MessageId) -> Result<MessageView, ClientError> {
        self.post_action(&format!("api/messages/{id}/read")).await
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn notifications(
        &self,
        page: PageRequest,
    ) -> Result<Page<NotificationView>, ClientError> {
        self.get_query("api/notifications", &page).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn unread_notifications(&self) -> Result<i64, ClientError> {
        let count: UnreadCount = self.get("api/notifications/unread-count").await?;
        Ok(count.unread)
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn mark_notification_read(
        &self,
        id: NotificationId,
    ) -> Result<NotificationView, ClientError> {
        self.post_action(&format!("api/notifications/{id}/read"))
            .await
    }

    /// Mark every notification read and return how many changed.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn mark_all_notifications_read(&self) -> Result<u64, ClientError> {
        let updated: Updated = self.post_action("api/notifications/read-all").await?;
        Ok(updated.updated)
    }
}
