use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use notification_cell::{BroadcastReport, NotificationDispatcher};
use shared_database::BookingStore;
use shared_models::{OutboundMessage, SupportRequest, UserId};

use crate::models::AdminError;

#[derive(Debug)]
pub struct SupportReceipt {
    pub request: SupportRequest,
    pub admins_notified: BroadcastReport,
}

pub struct SupportService {
    store: Arc<dyn BookingStore>,
    notifications: Arc<NotificationDispatcher>,
}

impl SupportService {
    pub fn new(store: Arc<dyn BookingStore>, notifications: Arc<NotificationDispatcher>) -> Self {
        Self { store, notifications }
    }

    /// Logs an open request and forwards it to every administrator.
    pub async fn submit(
        &self,
        user_id: UserId,
        username: Option<&str>,
        message: &str,
    ) -> Result<SupportReceipt, AdminError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AdminError::InvalidPayload("Support message must not be empty".to_string()));
        }

        let request = self
            .store
            .insert_support_request(user_id, message, Utc::now())
            .await?;
        info!("Logged support request {} from {}", request.id, user_id);

        let text = format!(
            "🔔 New support request from User ID {} (Username: {}):\nMessage: {}",
            user_id,
            username.unwrap_or("N/A"),
            message
        );
        let admins_notified = self
            .notifications
            .notify_admins(&OutboundMessage::text(text))
            .await?;
        if admins_notified.success == 0 {
            warn!("Support request {} reached no administrator", request.id);
        }

        Ok(SupportReceipt {
            request,
            admins_notified,
        })
    }
}
