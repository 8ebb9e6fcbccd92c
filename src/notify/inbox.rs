use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::{Notification, NotificationStatus};
use crate::notify::NotificationSink;

/// Per-user notification feed backing the notifications API.
#[derive(Default)]
pub struct NotificationInbox {
    notifications: DashMap<Uuid, Notification>,
}

impl NotificationInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unseen(&self) -> Vec<Notification> {
        self.collect(|notification| notification.status == NotificationStatus::Unseen)
    }

    pub fn unseen_for_user(&self, user_id: Uuid) -> Vec<Notification> {
        self.collect(|notification| {
            notification.user_id == user_id && notification.status == NotificationStatus::Unseen
        })
    }

    pub fn mark_seen(&self, id: Uuid) -> Result<Notification, AppError> {
        let mut notification = self
            .notifications
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("notification {id} not found")))?;

        notification.status = NotificationStatus::Seen;
        Ok(notification.clone())
    }

    fn collect<F>(&self, keep: F) -> Vec<Notification>
    where
        F: Fn(&Notification) -> bool,
    {
        let mut notifications: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        notifications.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        notifications
    }
}

#[async_trait]
impl NotificationSink for NotificationInbox {
    async fn notify(
        &self,
        recipient_id: Uuid,
        message: &str,
        header: &str,
        event_type: &str,
        object_id: Uuid,
    ) -> Result<(), AppError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: recipient_id,
            message: message.to_string(),
            header: header.to_string(),
            event_type: event_type.to_string(),
            object_id,
            status: NotificationStatus::Unseen,
            created_at: Utc::now(),
        };
        self.notifications.insert(notification.id, notification);
        Ok(())
    }
}
