use thiserror::Error;

use notification_cell::DeliveryOutcome;
use shared_database::StoreError;
use shared_models::{AppError, Booking, BookingId, BookingStatus, SlotKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> BookingStatus {
        match self {
            Decision::Approve => BookingStatus::Approved,
            Decision::Reject => BookingStatus::Rejected,
        }
    }
}

/// Result of a doctor decision. The ledger change is durable whatever the
/// delivery outcomes say.
#[derive(Debug, Clone)]
pub struct DecisionReport {
    pub booking: Booking,
    pub patient_outcome: DeliveryOutcome,
    /// Only set on approval.
    pub doctor_outcome: Option<DeliveryOutcome>,
    pub escalated: bool,
}

/// Result of asking the doctor to decide on a new pending booking.
#[derive(Debug, Clone)]
pub struct ApprovalRequestReport {
    pub booking: Booking,
    pub doctor_outcome: DeliveryOutcome,
    pub escalated: bool,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Booking not found: {0}")]
    NotFound(BookingId),

    #[error("Slot {0} is no longer available")]
    SlotTaken(SlotKey),

    #[error("Booking has already been {status}")]
    AlreadyDecided { status: BookingStatus },

    #[error("Booking is already cancelled")]
    AlreadyCancelled,

    #[error("Booking cannot move from {from} to {to}")]
    InvalidStatusTransition { from: BookingStatus, to: BookingStatus },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BookingNotFound(id) => BookingError::NotFound(id),
            other => BookingError::Storage(other),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(_) => AppError::NotFound(err.to_string()),
            BookingError::SlotTaken(_)
            | BookingError::AlreadyDecided { .. }
            | BookingError::AlreadyCancelled
            | BookingError::InvalidStatusTransition { .. } => AppError::Conflict(err.to_string()),
            BookingError::Validation(msg) => AppError::Validation(msg),
            BookingError::Storage(e) => e.into(),
        }
    }
}
