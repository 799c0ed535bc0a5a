use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Telegram user / chat id. Doctors and admins are addressed by the same id space.
pub type UserId = i64;
pub type BookingId = i64;

/// (doctor, date, time-of-day): the unit of bookable availability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub doctor_id: UserId,
    pub booking_date: NaiveDate,
    pub time_slot: String,
}

impl SlotKey {
    pub fn new(doctor_id: UserId, booking_date: NaiveDate, time_slot: impl Into<String>) -> Self {
        Self {
            doctor_id,
            booking_date,
            time_slot: time_slot.into(),
        }
    }

    pub fn lock_key(&self) -> String {
        format!("slot_{}_{}_{}", self.doctor_id, self.booking_date, self.time_slot)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} (doctor {})",
            self.booking_date, self.time_slot, self.doctor_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: i64,
    pub booking_date: NaiveDate,
    pub time_slot: String,
    pub doctor_id: UserId,
    pub is_available: bool,
}

impl Slot {
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.doctor_id, self.booking_date, self.time_slot.clone())
    }
}

/// A slot joined with the publishing doctor's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotListing {
    pub slot: Slot,
    pub doctor_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    /// Pending and approved bookings claim their slot.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "approved" => Ok(BookingStatus::Approved),
            "rejected" => Ok(BookingStatus::Rejected),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub patient_name: String,
    pub patient_dob: NaiveDate,
    pub time_slot: String,
    pub booking_date: NaiveDate,
    pub doctor_id: UserId,
    pub status: BookingStatus,
    pub confirmed: bool,
}

impl Booking {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.doctor_id, self.booking_date, self.time_slot.clone())
    }
}

/// Everything the ledger needs to reserve a slot for a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub user_id: UserId,
    pub patient_name: String,
    pub patient_dob: NaiveDate,
    pub slot: SlotKey,
}

/// What happens to the referenced slot when a booking changes status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotEffect {
    None,
    Hold,
    Release,
}

/// A compare-and-set status change, applied atomically together with its slot effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingTransition {
    pub booking_id: BookingId,
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub confirmed: bool,
    pub slot_effect: SlotEffect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub user_id: Option<UserId>,
    pub doctor_id: Option<UserId>,
    pub confirmed_only: bool,
    pub statuses: Option<Vec<BookingStatus>>,
}

impl BookingFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn confirmed() -> Self {
        Self {
            confirmed_only: true,
            ..Self::default()
        }
    }

    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: Vec<BookingStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    pub fn only_confirmed(mut self) -> Self {
        self.confirmed_only = true;
        self
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.user_id.map_or(true, |id| booking.user_id == id)
            && self.doctor_id.map_or(true, |id| booking.doctor_id == id)
            && (!self.confirmed_only || booking.confirmed)
            && self
                .statuses
                .as_ref()
                .map_or(true, |statuses| statuses.contains(&booking.status))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotQuery {
    pub doctor_id: Option<UserId>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub available_only: bool,
}

impl SlotQuery {
    pub fn matches(&self, slot: &Slot) -> bool {
        self.doctor_id.map_or(true, |id| slot.doctor_id == id)
            && slot.booking_date >= self.from
            && slot.booking_date <= self.to
            && (!self.available_only || slot.is_available)
    }
}
