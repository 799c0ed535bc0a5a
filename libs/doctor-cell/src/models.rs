use thiserror::Error;

use shared_database::StoreError;
use shared_models::{AppError, SlotKey, UserId};

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor not found: {0}")]
    NotFound(UserId),

    #[error("Doctor name must not be empty")]
    InvalidName,

    #[error("Database error: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Unknown doctor: {0}")]
    UnknownDoctor(UserId),

    #[error("{0} is not one of the offered consultation times")]
    InvalidTimeOfDay(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(SlotKey),

    #[error("Database error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for AvailabilityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SlotNotFound(key) => AvailabilityError::SlotNotFound(key),
            other => AvailabilityError::Storage(other),
        }
    }
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound(_) => AppError::NotFound(err.to_string()),
            DoctorError::InvalidName => AppError::Validation(err.to_string()),
            DoctorError::Storage(e) => e.into(),
        }
    }
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::UnknownDoctor(_)
            | AvailabilityError::InvalidTimeOfDay(_)
            | AvailabilityError::InvalidDate(_) => AppError::Validation(err.to_string()),
            AvailabilityError::SlotNotFound(_) => AppError::NotFound(err.to_string()),
            AvailabilityError::Storage(e) => e.into(),
        }
    }
}
