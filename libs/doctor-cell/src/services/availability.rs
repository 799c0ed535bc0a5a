use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use shared_config::AppConfig;
use shared_database::BookingStore;
use shared_models::{
    BookingFilter, BookingStatus, Slot, SlotKey, SlotListing, SlotQuery, UserId,
};
use shared_utils::dates::{horizon, parse_iso_date};
use shared_utils::Clock;

use crate::models::AvailabilityError;

/// Published doctor availability. Slots are toggled, never deleted.
pub struct AvailabilityService {
    store: Arc<dyn BookingStore>,
    config: Arc<AppConfig>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn BookingStore>, config: Arc<AppConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { store, config, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Current `[today, today + horizon]` window.
    pub fn booking_window(&self) -> (NaiveDate, NaiveDate) {
        horizon(self.clock.today(), self.config.booking_horizon_days)
    }

    /// Available slots for a doctor, ordered by date then time. The range is
    /// clamped to the booking window and slots with a pending or approved
    /// booking are left out even if their flag still says available.
    #[instrument(skip(self))]
    pub async fn list_available(
        &self,
        doctor_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Slot>, AvailabilityError> {
        self.available_slots(Some(doctor_id), from, to).await
    }

    pub async fn list_available_in_horizon(&self, doctor_id: UserId) -> Result<Vec<Slot>, AvailabilityError> {
        let (from, to) = self.booking_window();
        self.available_slots(Some(doctor_id), from, to).await
    }

    /// Every doctor's open slots in the window, with doctor names.
    pub async fn list_all_available(&self) -> Result<Vec<SlotListing>, AvailabilityError> {
        let (from, to) = self.booking_window();
        let slots = self.available_slots(None, from, to).await?;
        let names: HashMap<UserId, String> = self
            .store
            .list_doctors()
            .await?
            .into_iter()
            .map(|d| (d.user_id, d.name))
            .collect();

        Ok(slots
            .into_iter()
            .map(|slot| {
                let doctor_name = names
                    .get(&slot.doctor_id)
                    .cloned()
                    .unwrap_or_else(|| format!("Doctor {}", slot.doctor_id));
                SlotListing { slot, doctor_name }
            })
            .collect())
    }

    pub async fn is_available(&self, key: &SlotKey) -> Result<bool, AvailabilityError> {
        let (from, to) = self.booking_window();
        if key.booking_date < from || key.booking_date > to {
            return Ok(false);
        }

        let Some(slot) = self.store.get_slot(key).await? else {
            return Ok(false);
        };
        if !slot.is_available {
            return Ok(false);
        }

        Ok(!self.claimed_keys(Some(key.doctor_id)).await?.contains(key))
    }

    /// Idempotent publish of one slot.
    #[instrument(skip(self))]
    pub async fn publish(
        &self,
        doctor_id: UserId,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<Slot, AvailabilityError> {
        if self.store.get_doctor(doctor_id).await?.is_none() {
            return Err(AvailabilityError::UnknownDoctor(doctor_id));
        }
        if !self.config.is_offered_time(time_slot) {
            return Err(AvailabilityError::InvalidTimeOfDay(time_slot.to_string()));
        }

        let slot = self
            .store
            .insert_slot(&SlotKey::new(doctor_id, date, time_slot))
            .await?;
        info!("Published slot {} for doctor {}", slot.id, doctor_id);
        Ok(slot)
    }

    pub async fn publish_raw(
        &self,
        date: &str,
        time_slot: &str,
        doctor_id: UserId,
    ) -> Result<Slot, AvailabilityError> {
        let date = parse_iso_date(date).ok_or_else(|| AvailabilityError::InvalidDate(date.trim().to_string()))?;
        self.publish(doctor_id, date, time_slot.trim()).await
    }

    /// Marks the slot unavailable. Holding a held slot is a no-op.
    pub async fn hold(&self, key: &SlotKey) -> Result<Slot, AvailabilityError> {
        self.set_availability(key, false).await
    }

    /// Marks the slot available. Releasing an open slot is a no-op.
    pub async fn release(&self, key: &SlotKey) -> Result<Slot, AvailabilityError> {
        self.set_availability(key, true).await
    }

    async fn set_availability(&self, key: &SlotKey, available: bool) -> Result<Slot, AvailabilityError> {
        let slot = self
            .store
            .get_slot(key)
            .await?
            .ok_or_else(|| AvailabilityError::SlotNotFound(key.clone()))?;

        if slot.is_available == available {
            debug!("Slot {} already has availability {}", key, available);
            return Ok(slot);
        }
        Ok(self.store.set_slot_availability(key, available).await?)
    }

    async fn available_slots(
        &self,
        doctor_id: Option<UserId>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Slot>, AvailabilityError> {
        let (window_start, window_end) = self.booking_window();
        let from = from.max(window_start);
        let to = to.min(window_end);
        if from > to {
            return Ok(Vec::new());
        }

        let slots = self
            .store
            .list_slots(&SlotQuery {
                doctor_id,
                from,
                to,
                available_only: true,
            })
            .await?;
        let claimed = self.claimed_keys(doctor_id).await?;

        Ok(slots
            .into_iter()
            .filter(|slot| !claimed.contains(&slot.key()))
            .collect())
    }

    async fn claimed_keys(&self, doctor_id: Option<UserId>) -> Result<HashSet<SlotKey>, AvailabilityError> {
        let filter = BookingFilter {
            doctor_id,
            ..BookingFilter::all()
        }
        .with_statuses(vec![BookingStatus::Pending, BookingStatus::Approved]);

        Ok(self
            .store
            .list_bookings(&filter)
            .await?
            .iter()
            .map(|b| b.slot_key())
            .collect())
    }
}
