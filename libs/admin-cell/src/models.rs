use std::str::FromStr;

use thiserror::Error;

use appointment_cell::BookingError;
use doctor_cell::{AvailabilityError, DoctorError};
use shared_database::StoreError;
use shared_models::{AppError, BookingId, SystemStats, UserId};

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("User {0} is not an administrator")]
    NotAnAdmin(UserId),

    #[error("Cannot remove the last administrator")]
    LastAdmin,

    #[error("Invalid input: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("Database error: {0}")]
    Storage(#[from] StoreError),
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::UserNotFound(_) | AdminError::NotAnAdmin(_) => AppError::NotFound(err.to_string()),
            AdminError::LastAdmin => AppError::Conflict(err.to_string()),
            AdminError::InvalidPayload(msg) => AppError::Validation(msg),
            AdminError::Availability(e) => e.into(),
            AdminError::Doctor(e) => e.into(),
            AdminError::Booking(e) => e.into(),
            AdminError::Storage(e) => e.into(),
        }
    }
}

/// `isCaregiver,linkedPatientName`, e.g. `1,John Doe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEditPayload {
    pub is_caregiver: bool,
    pub linked_patient: Option<String>,
}

impl FromStr for UserEditPayload {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ',');
        let flag = parts.next().unwrap_or_default().trim();
        let is_caregiver = match flag.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => {
                return Err(AdminError::InvalidPayload(
                    "Use format: is_caregiver,linked_patient (e.g. 1,John Doe)".to_string(),
                ))
            }
        };
        let linked_patient = parts
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        if is_caregiver && linked_patient.is_none() {
            return Err(AdminError::InvalidPayload(
                "A caregiver needs the name of the linked patient".to_string(),
            ));
        }

        Ok(Self {
            is_caregiver,
            linked_patient: if is_caregiver { linked_patient } else { None },
        })
    }
}

/// `date,timeOfDay,doctorId`, e.g. `2025-04-23,09:00,987654321`. The date
/// stays textual so the slot store reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPayload {
    pub date: String,
    pub time_slot: String,
    pub doctor_id: UserId,
}

impl FromStr for SlotPayload {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [date, time_slot, doctor_id] = parts.as_slice() else {
            return Err(AdminError::InvalidPayload(
                "Use format: date,time_slot,doctor_id (e.g. 2025-04-23,09:00,987654321)".to_string(),
            ));
        };
        let doctor_id = doctor_id
            .parse::<UserId>()
            .map_err(|_| AdminError::InvalidPayload(format!("Invalid doctor ID: {}", doctor_id)))?;

        Ok(Self {
            date: date.to_string(),
            time_slot: time_slot.to_string(),
            doctor_id,
        })
    }
}

/// `userId,name`. Everything after the first comma is the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorPayload {
    pub user_id: UserId,
    pub name: String,
}

impl FromStr for DoctorPayload {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((id, name)) = s.split_once(',') else {
            return Err(AdminError::InvalidPayload(
                "Use format: user_id,name (e.g. 987654321,Dr. Martin)".to_string(),
            ));
        };
        let user_id = parse_user_id(id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AdminError::InvalidPayload("Doctor name must not be empty".to_string()));
        }
        Ok(Self {
            user_id,
            name: name.to_string(),
        })
    }
}

pub fn parse_user_id(raw: &str) -> Result<UserId, AdminError> {
    raw.trim()
        .parse::<UserId>()
        .map_err(|_| AdminError::InvalidPayload(format!("Invalid user ID: {}", raw.trim())))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDeletion {
    pub user_id: UserId,
    pub profile_deleted: bool,
    pub cancelled: Vec<BookingId>,
    pub rejected: Vec<BookingId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub storage_ok: bool,
    pub stats: Option<SystemStats>,
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn user_edit_payload() {
        assert_eq!(
            "1, John Doe".parse::<UserEditPayload>().unwrap(),
            UserEditPayload { is_caregiver: true, linked_patient: Some("John Doe".into()) }
        );
        assert_eq!(
            "0".parse::<UserEditPayload>().unwrap(),
            UserEditPayload { is_caregiver: false, linked_patient: None }
        );
        assert_matches!("1,".parse::<UserEditPayload>(), Err(AdminError::InvalidPayload(_)));
        assert_matches!("maybe,Jo".parse::<UserEditPayload>(), Err(AdminError::InvalidPayload(_)));
    }

    #[test]
    fn slot_payload_needs_three_fields() {
        let payload: SlotPayload = "2025-04-23, 09:00, 987654321".parse().unwrap();
        assert_eq!(payload.date, "2025-04-23");
        assert_eq!(payload.time_slot, "09:00");
        assert_eq!(payload.doctor_id, 987654321);

        assert_matches!("2025-04-23,09:00".parse::<SlotPayload>(), Err(AdminError::InvalidPayload(_)));
        assert_matches!("2025-04-23,09:00,dr".parse::<SlotPayload>(), Err(AdminError::InvalidPayload(_)));
    }

    #[test]
    fn doctor_name_keeps_commas() {
        let payload: DoctorPayload = "987654321,Dr. Martin, FMH".parse().unwrap();
        assert_eq!(payload.user_id, 987654321);
        assert_eq!(payload.name, "Dr. Martin, FMH");
        assert_matches!("Dr. Martin".parse::<DoctorPayload>(), Err(AdminError::InvalidPayload(_)));
    }
}
