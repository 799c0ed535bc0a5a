use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use shared_config::AppConfig;
use shared_database::{BookingStore, MemoryStore};
use shared_models::{DeliveryFailure, Doctor, Messenger, OutboundMessage, SlotKey, UserId};

use crate::dates::FixedClock;

pub const DOCTOR_MARTIN: UserId = 42;
pub const DOCTOR_WEBER: UserId = 43;
pub const ADMIN_ID: UserId = 9000;
pub const PATIENT_ID: UserId = 1001;
pub const SECOND_PATIENT_ID: UserId = 1002;

pub struct TestConfig {
    pub admin_ids: Vec<UserId>,
    pub broadcast_delay: Duration,
    pub booking_horizon_days: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            admin_ids: vec![ADMIN_ID],
            broadcast_delay: Duration::ZERO,
            booking_horizon_days: 7,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            telegram_bot_token: "test-bot-token".to_string(),
            admin_ids: self.admin_ids.clone(),
            broadcast_delay: self.broadcast_delay,
            booking_horizon_days: self.booking_horizon_days,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// 2025-04-22, a Tuesday. Fixture slots sit on the following day.
pub fn fixture_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 22).unwrap_or_default()
}

pub fn fixture_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(fixture_today()))
}

pub fn slot_key(doctor_id: UserId, date: &str, time_slot: &str) -> SlotKey {
    let booking_date = crate::dates::parse_iso_date(date).unwrap_or_else(fixture_today);
    SlotKey::new(doctor_id, booking_date, time_slot)
}

/// A memory store seeded with two doctors, one admin and Dr. Martin's
/// 2025-04-23 09:00 and 10:00 slots.
pub struct TestFixtures {
    pub store: Arc<MemoryStore>,
    pub config: Arc<AppConfig>,
    pub clock: Arc<FixedClock>,
}

impl TestFixtures {
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    pub async fn with_config(config: TestConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        for doctor in [
            Doctor { user_id: DOCTOR_MARTIN, name: "Dr. Martin".to_string() },
            Doctor { user_id: DOCTOR_WEBER, name: "Dr. Weber".to_string() },
        ] {
            let _ = store.insert_doctor(&doctor).await;
        }
        for admin in &config.admin_ids {
            let _ = store.insert_admin(*admin).await;
        }
        for time in ["09:00", "10:00"] {
            let _ = store.insert_slot(&slot_key(DOCTOR_MARTIN, "2025-04-23", time)).await;
        }

        Self {
            store,
            config: config.to_arc(),
            clock: fixture_clock(),
        }
    }

    pub fn martin_nine(&self) -> SlotKey {
        slot_key(DOCTOR_MARTIN, "2025-04-23", "09:00")
    }

    pub fn dyn_store(&self) -> Arc<dyn BookingStore> {
        self.store.clone()
    }
}

/// Records every delivery; recipients registered with `fail_for` get the
/// configured failure instead.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(UserId, OutboundMessage)>>,
    failures: Mutex<HashMap<UserId, DeliveryFailure>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, recipient: UserId, failure: DeliveryFailure) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(recipient, failure);
        }
    }

    pub fn sent(&self) -> Vec<(UserId, OutboundMessage)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, recipient: UserId) -> Vec<OutboundMessage> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn deliver(&self, recipient: UserId, message: &OutboundMessage) -> Result<(), DeliveryFailure> {
        let failure = self
            .failures
            .lock()
            .ok()
            .and_then(|failures| failures.get(&recipient).cloned());
        if let Some(failure) = failure {
            return Err(failure);
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((recipient, message.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default().to_app_config();
        assert_eq!(config.admin_ids, vec![ADMIN_ID]);
        assert_eq!(config.broadcast_delay, Duration::ZERO);
        assert!(config.is_configured());
    }

    #[tokio::test]
    async fn test_fixtures_seed_store() {
        let fixtures = TestFixtures::new().await;
        let doctors = fixtures.store.list_doctors().await.unwrap();
        assert_eq!(doctors.len(), 2);
        assert!(fixtures.store.get_slot(&fixtures.martin_nine()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_recording_messenger_failures() {
        let messenger = RecordingMessenger::new();
        messenger.fail_for(7, DeliveryFailure::Blocked);

        assert!(messenger.deliver(7, &OutboundMessage::text("hi")).await.is_err());
        assert!(messenger.deliver(8, &OutboundMessage::text("hi")).await.is_ok());
        assert_eq!(messenger.sent_to(8).len(), 1);
        assert!(messenger.sent_to(7).is_empty());
    }
}
