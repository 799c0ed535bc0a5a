// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use shared_database::{BookingStore, StoreError};
use shared_models::{Booking, BookingFilter, BookingId, BookingStatus, NewBooking, UserId};

use crate::models::BookingError;
use crate::services::consistency::SlotLockRegistry;
use crate::services::lifecycle::BookingLifecycleService;

/// Booking records and their status. Owns the one-active-booking-per-slot rule.
pub struct BookingLedger {
    store: Arc<dyn BookingStore>,
    locks: Arc<SlotLockRegistry>,
    lifecycle: BookingLifecycleService,
}

impl BookingLedger {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self::with_locks(store, Arc::new(SlotLockRegistry::new()))
    }

    pub fn with_locks(store: Arc<dyn BookingStore>, locks: Arc<SlotLockRegistry>) -> Self {
        Self {
            store,
            locks,
            lifecycle: BookingLifecycleService::new(),
        }
    }

    /// Reserve-if-available as one step. `SlotTaken` means the caller must
    /// send the user back to slot selection.
    #[instrument(skip(self, request), fields(user_id = request.user_id, slot = %request.slot))]
    pub async fn create_pending(&self, request: NewBooking) -> Result<Booking, BookingError> {
        if request.patient_name.trim().is_empty() {
            return Err(BookingError::Validation("Patient name must not be empty".to_string()));
        }

        let _guard = self.locks.acquire(&request.slot).await;
        match self.store.reserve_slot(&request).await {
            Ok(booking) => {
                info!("Created pending booking {} for {}", booking.id, request.slot);
                Ok(booking)
            }
            Err(StoreError::SlotUnavailable) => {
                warn!("Slot {} taken before booking could be created", request.slot);
                Err(BookingError::SlotTaken(request.slot))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// pending -> approved, holding the slot in the same unit of work.
    #[instrument(skip(self))]
    pub async fn approve(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.transition(booking_id, BookingStatus::Approved).await
    }

    /// pending -> rejected. The slot was never held and stays open.
    #[instrument(skip(self))]
    pub async fn reject(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.transition(booking_id, BookingStatus::Rejected).await
    }

    /// approved -> cancelled, releasing the slot.
    #[instrument(skip(self))]
    pub async fn cancel(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.transition(booking_id, BookingStatus::Cancelled).await
    }

    async fn transition(&self, booking_id: BookingId, new_status: BookingStatus) -> Result<Booking, BookingError> {
        let booking = self.get_by_id(booking_id).await?;
        let _guard = self.locks.acquire(&booking.slot_key()).await;

        // Re-read under the slot lock; another handler may have decided meanwhile.
        let booking = self.get_by_id(booking_id).await?;
        let plan = self.lifecycle.plan_transition(&booking, new_status)?;

        match self.store.apply_transition(&plan).await {
            Ok(updated) => {
                info!("Booking {} moved {} -> {}", booking_id, plan.from, plan.to);
                Ok(updated)
            }
            Err(StoreError::StatusMismatch { current }) => {
                Err(self.lifecycle.conflict_for(current, new_status))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_id(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound(booking_id))
    }

    /// User-facing listing: confirmed bookings only.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Booking>, BookingError> {
        debug!("Listing confirmed bookings for user {}", user_id);
        Ok(self
            .store
            .list_bookings(&BookingFilter::for_user(user_id).only_confirmed())
            .await?)
    }

    pub async fn list_active_for_user(&self, user_id: UserId) -> Result<Vec<Booking>, BookingError> {
        Ok(self
            .store
            .list_bookings(
                &BookingFilter::for_user(user_id)
                    .with_statuses(vec![BookingStatus::Pending, BookingStatus::Approved]),
            )
            .await?)
    }

    pub async fn list_confirmed(&self) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.list_bookings(&BookingFilter::confirmed()).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.list_bookings(&BookingFilter::all()).await?)
    }
}
