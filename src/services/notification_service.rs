use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::Result,
    models::{DeletedNotification, MarkReadResult, Notification, UnreadCount},
    stores::NotificationStore,
};

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Create a new notification
    pub async fn create_notification(
        &self,
        recipient_id: Uuid,
        message: impl Into<String>,
        link: Option<String>,
    ) -> Result<Notification> {
        let notification = Notification::new(recipient_id, message.into(), link);
        self.store.insert_notification(&notification).await?;

        tracing::debug!(
            notification_id = %notification.id,
            %recipient_id,
            "notification created"
        );
        Ok(notification)
    }

    /// Get notifications for a user, newest first
    pub async fn get_user_notifications(
        &self,
        user_id: Uuid,
        skip: u32,
        limit: u32,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        self.store
            .list_notifications(user_id, skip, limit, unread_only)
            .await
    }

    pub async fn get_unread_count(&self, user_id: Uuid) -> Result<UnreadCount> {
        let count = self.store.unread_count(user_id).await?;
        Ok(UnreadCount { count })
    }

    /// Marking an already-read notification succeeds with `updated: 0`.
    pub async fn mark_as_read(&self, user_id: Uuid, notification_id: Uuid) -> Result<MarkReadResult> {
        let flipped = self.store.mark_read(user_id, notification_id).await?;
        Ok(MarkReadResult {
            updated: u64::from(flipped),
        })
    }

    pub async fn mark_all_as_read(&self, user_id: Uuid) -> Result<MarkReadResult> {
        let updated = self.store.mark_all_read(user_id).await?;
        if updated > 0 {
            tracing::debug!(%user_id, updated, "notifications marked read");
        }
        Ok(MarkReadResult { updated })
    }

    /// `NotFound` for notifications the user does not own.
    pub async fn delete_notification(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<DeletedNotification> {
        let was_unread = self.store.delete_notification(user_id, notification_id).await?;
        tracing::debug!(%notification_id, %user_id, was_unread, "notification deleted");
        Ok(DeletedNotification { was_unread })
    }
}
