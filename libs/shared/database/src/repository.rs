use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use shared_models::{
    AppError, Booking, BookingFilter, BookingId, BookingStatus, BookingTransition, Doctor,
    NewBooking, Slot, SlotKey, SlotQuery, SupportRequest, SystemStats, UserId, UserProfile,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Slot is not available for booking")]
    SlotUnavailable,

    #[error("Slot not found: {0}")]
    SlotNotFound(SlotKey),

    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    #[error("Booking status changed concurrently, now {current}")]
    StatusMismatch { current: BookingStatus },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Backend(format!("{:#}", err))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SlotUnavailable => AppError::Conflict(err.to_string()),
            StoreError::StatusMismatch { .. } => AppError::Conflict(err.to_string()),
            StoreError::SlotNotFound(_) | StoreError::BookingNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            StoreError::Backend(msg) => AppError::Storage(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of removing an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRemoval {
    Removed,
    NotAnAdmin,
    /// Refused, the registry would be left empty.
    LastAdmin,
}

/// Everything the call service persists. `reserve_slot` and `apply_transition`
/// are the only operations that must be atomic against concurrent callers.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn list_doctors(&self) -> StoreResult<Vec<Doctor>>;
    async fn get_doctor(&self, doctor_id: UserId) -> StoreResult<Option<Doctor>>;
    /// Returns false when the doctor was already registered.
    async fn insert_doctor(&self, doctor: &Doctor) -> StoreResult<bool>;

    async fn list_admins(&self) -> StoreResult<Vec<UserId>>;
    async fn is_admin(&self, user_id: UserId) -> StoreResult<bool>;
    async fn insert_admin(&self, user_id: UserId) -> StoreResult<bool>;
    /// Deletes the administrator unless they are the only one left. The check
    /// and the delete are one atomic operation.
    async fn remove_admin(&self, user_id: UserId) -> StoreResult<AdminRemoval>;

    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<UserProfile>>;
    async fn list_profiles(&self) -> StoreResult<Vec<UserProfile>>;
    async fn upsert_profile(&self, profile: &UserProfile) -> StoreResult<UserProfile>;
    async fn delete_profile(&self, user_id: UserId) -> StoreResult<bool>;

    async fn get_slot(&self, key: &SlotKey) -> StoreResult<Option<Slot>>;
    /// Idempotent: an existing slot is returned unchanged.
    async fn insert_slot(&self, key: &SlotKey) -> StoreResult<Slot>;
    /// Ordered by date, then time of day.
    async fn list_slots(&self, query: &SlotQuery) -> StoreResult<Vec<Slot>>;
    async fn set_slot_availability(&self, key: &SlotKey, available: bool) -> StoreResult<Slot>;

    /// Inserts a pending booking only if the slot exists, is available and has
    /// no pending or approved booking. Fails with `SlotUnavailable` otherwise.
    async fn reserve_slot(&self, request: &NewBooking) -> StoreResult<Booking>;
    /// Compare-and-set on the booking status, applying the slot effect in the
    /// same unit of work.
    async fn apply_transition(&self, transition: &BookingTransition) -> StoreResult<Booking>;
    async fn get_booking(&self, booking_id: BookingId) -> StoreResult<Option<Booking>>;
    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>>;

    async fn insert_support_request(
        &self,
        user_id: UserId,
        message: &str,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<SupportRequest>;

    async fn stats(&self) -> StoreResult<SystemStats>;
}
