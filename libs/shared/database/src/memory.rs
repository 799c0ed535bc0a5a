use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use shared_models::{
    Booking, BookingFilter, BookingId, BookingStatus, BookingTransition, Doctor, NewBooking, Slot,
    SlotEffect, SlotKey, SlotQuery, SupportRequest, SupportStatus, SystemStats, UserId,
    UserProfile,
};

use crate::repository::{AdminRemoval, BookingStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    doctors: BTreeMap<UserId, Doctor>,
    admins: BTreeSet<UserId>,
    profiles: BTreeMap<UserId, UserProfile>,
    slots: BTreeMap<SlotKey, Slot>,
    bookings: BTreeMap<BookingId, Booking>,
    support_requests: Vec<SupportRequest>,
    next_slot_id: i64,
    next_booking_id: i64,
}

impl Tables {
    fn slot_claimed(&self, key: &SlotKey) -> bool {
        self.bookings
            .values()
            .any(|b| b.status.is_active() && b.slot_key() == *key)
    }
}

/// Process-local store. Every mutation runs under one write lock, which makes
/// `reserve_slot` and `apply_transition` atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with a backend error until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.check_online()
    }

    async fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let mut doctors: Vec<Doctor> = tables.doctors.values().cloned().collect();
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }

    async fn get_doctor(&self, doctor_id: UserId) -> StoreResult<Option<Doctor>> {
        self.check_online()?;
        Ok(self.tables.read().await.doctors.get(&doctor_id).cloned())
    }

    async fn insert_doctor(&self, doctor: &Doctor) -> StoreResult<bool> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        if tables.doctors.contains_key(&doctor.user_id) {
            return Ok(false);
        }
        tables.doctors.insert(doctor.user_id, doctor.clone());
        Ok(true)
    }

    async fn list_admins(&self) -> StoreResult<Vec<UserId>> {
        self.check_online()?;
        Ok(self.tables.read().await.admins.iter().copied().collect())
    }

    async fn is_admin(&self, user_id: UserId) -> StoreResult<bool> {
        self.check_online()?;
        Ok(self.tables.read().await.admins.contains(&user_id))
    }

    async fn insert_admin(&self, user_id: UserId) -> StoreResult<bool> {
        self.check_online()?;
        Ok(self.tables.write().await.admins.insert(user_id))
    }

    async fn remove_admin(&self, user_id: UserId) -> StoreResult<AdminRemoval> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        if !tables.admins.contains(&user_id) {
            return Ok(AdminRemoval::NotAnAdmin);
        }
        if tables.admins.len() == 1 {
            return Ok(AdminRemoval::LastAdmin);
        }
        tables.admins.remove(&user_id);
        Ok(AdminRemoval::Removed)
    }

    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<UserProfile>> {
        self.check_online()?;
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn list_profiles(&self) -> StoreResult<Vec<UserProfile>> {
        self.check_online()?;
        Ok(self.tables.read().await.profiles.values().cloned().collect())
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> StoreResult<UserProfile> {
        self.check_online()?;
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.user_id, profile.clone());
        Ok(profile.clone())
    }

    async fn delete_profile(&self, user_id: UserId) -> StoreResult<bool> {
        self.check_online()?;
        Ok(self.tables.write().await.profiles.remove(&user_id).is_some())
    }

    async fn get_slot(&self, key: &SlotKey) -> StoreResult<Option<Slot>> {
        self.check_online()?;
        Ok(self.tables.read().await.slots.get(key).cloned())
    }

    async fn insert_slot(&self, key: &SlotKey) -> StoreResult<Slot> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.slots.get(key) {
            return Ok(existing.clone());
        }
        tables.next_slot_id += 1;
        let slot = Slot {
            id: tables.next_slot_id,
            booking_date: key.booking_date,
            time_slot: key.time_slot.clone(),
            doctor_id: key.doctor_id,
            is_available: true,
        };
        tables.slots.insert(key.clone(), slot.clone());
        Ok(slot)
    }

    async fn list_slots(&self, query: &SlotQuery) -> StoreResult<Vec<Slot>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let mut slots: Vec<Slot> = tables
            .slots
            .values()
            .filter(|slot| query.matches(slot))
            .cloned()
            .collect();
        slots.sort_by(|a, b| {
            (a.booking_date, &a.time_slot, a.doctor_id).cmp(&(b.booking_date, &b.time_slot, b.doctor_id))
        });
        Ok(slots)
    }

    async fn set_slot_availability(&self, key: &SlotKey, available: bool) -> StoreResult<Slot> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let slot = tables
            .slots
            .get_mut(key)
            .ok_or_else(|| StoreError::SlotNotFound(key.clone()))?;
        slot.is_available = available;
        Ok(slot.clone())
    }

    async fn reserve_slot(&self, request: &NewBooking) -> StoreResult<Booking> {
        self.check_online()?;
        let mut tables = self.tables.write().await;

        let available = tables
            .slots
            .get(&request.slot)
            .map(|slot| slot.is_available)
            .unwrap_or(false);
        if !available || tables.slot_claimed(&request.slot) {
            debug!("Reservation refused for {}", request.slot);
            return Err(StoreError::SlotUnavailable);
        }

        tables.next_booking_id += 1;
        let booking = Booking {
            id: tables.next_booking_id,
            user_id: request.user_id,
            patient_name: request.patient_name.clone(),
            patient_dob: request.patient_dob,
            time_slot: request.slot.time_slot.clone(),
            booking_date: request.slot.booking_date,
            doctor_id: request.slot.doctor_id,
            status: BookingStatus::Pending,
            confirmed: false,
        };
        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn apply_transition(&self, transition: &BookingTransition) -> StoreResult<Booking> {
        self.check_online()?;
        let mut tables = self.tables.write().await;

        let current = tables
            .bookings
            .get(&transition.booking_id)
            .ok_or(StoreError::BookingNotFound(transition.booking_id))?;
        if current.status != transition.from {
            return Err(StoreError::StatusMismatch { current: current.status });
        }
        let key = current.slot_key();

        match transition.slot_effect {
            SlotEffect::None => {}
            SlotEffect::Hold | SlotEffect::Release => {
                let slot = tables
                    .slots
                    .get_mut(&key)
                    .ok_or_else(|| StoreError::SlotNotFound(key.clone()))?;
                slot.is_available = transition.slot_effect == SlotEffect::Release;
            }
        }

        let booking = tables
            .bookings
            .get_mut(&transition.booking_id)
            .ok_or(StoreError::BookingNotFound(transition.booking_id))?;
        booking.status = transition.to;
        booking.confirmed = transition.confirmed;
        Ok(booking.clone())
    }

    async fn get_booking(&self, booking_id: BookingId) -> StoreResult<Option<Booking>> {
        self.check_online()?;
        Ok(self.tables.read().await.bookings.get(&booking_id).cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect())
    }

    async fn insert_support_request(
        &self,
        user_id: UserId,
        message: &str,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<SupportRequest> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let request = SupportRequest {
            id: tables.support_requests.len() as i64 + 1,
            user_id,
            message: message.to_string(),
            timestamp,
            status: SupportStatus::Open,
        };
        tables.support_requests.push(request.clone());
        Ok(request)
    }

    async fn stats(&self) -> StoreResult<SystemStats> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(SystemStats {
            total_bookings: tables.bookings.values().filter(|b| b.confirmed).count() as u64,
            active_users: tables.profiles.len() as u64,
            total_admins: tables.admins.len() as u64,
            total_doctors: tables.doctors.len() as u64,
        })
    }
}
