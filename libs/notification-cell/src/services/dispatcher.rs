use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use shared_config::AppConfig;
use shared_database::{BookingStore, StoreError};
use shared_models::{DeliveryFailure, Messenger, OutboundMessage, UserId};

use crate::models::{BroadcastReport, DeliveryOutcome};

/// Outbound delivery with per-recipient isolation. Nothing here retries.
pub struct NotificationDispatcher {
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn BookingStore>,
    inter_send_delay: Duration,
}

impl NotificationDispatcher {
    pub fn new(messenger: Arc<dyn Messenger>, store: Arc<dyn BookingStore>, config: &AppConfig) -> Self {
        Self::with_delay(messenger, store, config.broadcast_delay)
    }

    pub fn with_delay(
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn BookingStore>,
        inter_send_delay: Duration,
    ) -> Self {
        Self {
            messenger,
            store,
            inter_send_delay,
        }
    }

    /// One delivery attempt; failures come back classified instead of raised.
    pub async fn send(&self, recipient: UserId, message: &OutboundMessage) -> DeliveryOutcome {
        let outcome = DeliveryOutcome::from(self.messenger.deliver(recipient, message).await);
        match &outcome {
            DeliveryOutcome::Delivered => debug!("Delivered message to {}", recipient),
            DeliveryOutcome::Failed(DeliveryFailure::RateLimited { retry_after_secs }) => {
                warn!("Rate limited sending to {} (retry after {:?}s)", recipient, retry_after_secs)
            }
            DeliveryOutcome::Failed(failure) => warn!("Failed to notify {}: {}", recipient, failure),
        }
        outcome
    }

    /// Sequential fan-out with the configured pause between sends.
    #[instrument(skip(self, recipients, message), fields(recipients = recipients.len()))]
    pub async fn broadcast(&self, recipients: &[UserId], message: &OutboundMessage) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (index, recipient) in recipients.iter().enumerate() {
            if index > 0 && !self.inter_send_delay.is_zero() {
                tokio::time::sleep(self.inter_send_delay).await;
            }
            let outcome = self.send(*recipient, message).await;
            report.record(*recipient, &outcome);
        }

        info!("Broadcast finished: {} sent, {} failed", report.success, report.failure);
        report
    }

    pub async fn notify_admins(&self, message: &OutboundMessage) -> Result<BroadcastReport, StoreError> {
        let admins = self.store.list_admins().await?;
        if admins.is_empty() {
            warn!("No administrators registered, notification dropped: {}", message.text);
        }
        Ok(self.broadcast(&admins, message).await)
    }

    /// Tells every administrator that a notification to `recipient` failed.
    pub async fn escalate(&self, context: &str, recipient: UserId, failure: &DeliveryFailure) -> BroadcastReport {
        let text = format!(
            "⚠️ Notification error for {}: failed to notify {}: {}",
            context, recipient, failure
        );
        match self.notify_admins(&OutboundMessage::text(text)).await {
            Ok(report) => report,
            Err(e) => {
                error!("Could not load administrators to escalate failure for {}: {}", context, e);
                BroadcastReport::default()
            }
        }
    }
}
