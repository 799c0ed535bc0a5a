// libs/conversation-cell/src/commands.rs
use chrono::NaiveDate;

use shared_models::{BookingId, UserId};
use shared_utils::dates::parse_iso_date;

/// Telegram rejects callback payloads above this size.
pub const MAX_CALLBACK_BYTES: usize = 64;

/// Every entry action the bot understands. Button payloads and slash
/// commands are decoded into this once, at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Reset,
    Health,
    SetLanguage(String),
    Book,
    SelectDoctor,
    SelectDoctorId(UserId),
    SelectSlot {
        time_slot: String,
        date: NaiveDate,
        doctor_id: UserId,
    },
    CancelBookingMenu,
    CancelBooking(BookingId),
    BookForSelf,
    BookForCaregiver,
    ApproveBooking(BookingId),
    RejectBooking(BookingId),
    Info,
    Support,
    AdminPanel,
    UserMode,

    ListBookings,
    ManageBooking(BookingId),
    AdminCancelBooking(BookingId),
    ListUsers,
    ManageUser(UserId),
    EditUser(UserId),
    DeleteUser(UserId),
    AddAdmin,
    RemoveAdminMenu,
    RemoveAdmin(UserId),
    ManageSlotsMenu,
    AddSlotPrompt,
    ViewSlots,
    ManageDoctorsMenu,
    AddDoctorPrompt,
    ViewDoctors,
    SystemStats,
    BroadcastPrompt,
}

impl Command {
    /// Decodes a button payload. Unknown or malformed payloads yield `None`.
    pub fn parse_callback(data: &str) -> Option<Self> {
        let command = match data {
            "start" | "back_to_start" => Self::Start,
            "reset" => Self::Reset,
            "health" => Self::Health,
            "book" => Self::Book,
            "select_doctor" => Self::SelectDoctor,
            "cancel_booking" => Self::CancelBookingMenu,
            "book_self" => Self::BookForSelf,
            "book_caregiver" => Self::BookForCaregiver,
            "info" => Self::Info,
            "support" => Self::Support,
            "admin_panel" => Self::AdminPanel,
            "user_mode" => Self::UserMode,
            "admin_bookings" => Self::ListBookings,
            "admin_users" => Self::ListUsers,
            "admin_add" => Self::AddAdmin,
            "admin_remove" => Self::RemoveAdminMenu,
            "admin_slots" => Self::ManageSlotsMenu,
            "admin_add_slot" => Self::AddSlotPrompt,
            "admin_view_slots" => Self::ViewSlots,
            "admin_doctors" => Self::ManageDoctorsMenu,
            "admin_add_doctor" => Self::AddDoctorPrompt,
            "admin_view_doctors" => Self::ViewDoctors,
            "admin_stats" => Self::SystemStats,
            "admin_broadcast" => Self::BroadcastPrompt,
            _ => return Self::parse_parameterized(data),
        };
        Some(command)
    }

    fn parse_parameterized(data: &str) -> Option<Self> {
        if let Some(rest) = data.strip_prefix("slot_") {
            return Self::parse_slot(rest);
        }
        if let Some(code) = data.strip_prefix("lang_") {
            return (!code.is_empty()).then(|| Self::SetLanguage(code.to_string()));
        }

        let with_id: [(&str, fn(i64) -> Self); 10] = [
            ("doctor_", Self::SelectDoctorId),
            ("cancel_", Self::CancelBooking),
            ("approve_booking_", Self::ApproveBooking),
            ("reject_booking_", Self::RejectBooking),
            ("admin_booking_", Self::ManageBooking),
            ("admin_cancel_", Self::AdminCancelBooking),
            ("admin_user_", Self::ManageUser),
            ("admin_edit_user_", Self::EditUser),
            ("admin_delete_user_", Self::DeleteUser),
            ("admin_remove_id_", Self::RemoveAdmin),
        ];
        with_id.iter().find_map(|&(prefix, build)| {
            data.strip_prefix(prefix)
                .and_then(|id| id.parse::<i64>().ok())
                .map(build)
        })
    }

    fn parse_slot(rest: &str) -> Option<Self> {
        let mut parts = rest.splitn(3, '_');
        let time_slot = parts.next()?;
        let date = parse_iso_date(parts.next()?)?;
        let doctor_id = parts.next()?.parse().ok()?;
        if time_slot.is_empty() {
            return None;
        }
        Some(Self::SelectSlot {
            time_slot: time_slot.to_string(),
            date,
            doctor_id,
        })
    }

    /// Decodes `/start`, `/cancel`, `/health` and `/language <code>`. A bot
    /// mention suffix (`/start@doctomed_bot`) is accepted.
    pub fn parse_slash(text: &str) -> Option<Self> {
        let text = text.trim();
        let mut words = text.split_whitespace();
        let head = words.next()?.strip_prefix('/')?;
        let name = head.split('@').next().unwrap_or(head);

        match name {
            "start" => Some(Self::Start),
            "cancel" => Some(Self::Reset),
            "health" => Some(Self::Health),
            "language" => Some(Self::SetLanguage(words.next().unwrap_or_default().to_string())),
            _ => None,
        }
    }

    /// The button payload for this command.
    pub fn callback_data(&self) -> String {
        match self {
            Self::Start => "back_to_start".to_string(),
            Self::Reset => "reset".to_string(),
            Self::Health => "health".to_string(),
            Self::SetLanguage(code) => format!("lang_{}", code),
            Self::Book => "book".to_string(),
            Self::SelectDoctor => "select_doctor".to_string(),
            Self::SelectDoctorId(id) => format!("doctor_{}", id),
            Self::SelectSlot { time_slot, date, doctor_id } => {
                format!("slot_{}_{}_{}", time_slot, date.format("%Y-%m-%d"), doctor_id)
            }
            Self::CancelBookingMenu => "cancel_booking".to_string(),
            Self::CancelBooking(id) => format!("cancel_{}", id),
            Self::BookForSelf => "book_self".to_string(),
            Self::BookForCaregiver => "book_caregiver".to_string(),
            Self::ApproveBooking(id) => format!("approve_booking_{}", id),
            Self::RejectBooking(id) => format!("reject_booking_{}", id),
            Self::Info => "info".to_string(),
            Self::Support => "support".to_string(),
            Self::AdminPanel => "admin_panel".to_string(),
            Self::UserMode => "user_mode".to_string(),
            Self::ListBookings => "admin_bookings".to_string(),
            Self::ManageBooking(id) => format!("admin_booking_{}", id),
            Self::AdminCancelBooking(id) => format!("admin_cancel_{}", id),
            Self::ListUsers => "admin_users".to_string(),
            Self::ManageUser(id) => format!("admin_user_{}", id),
            Self::EditUser(id) => format!("admin_edit_user_{}", id),
            Self::DeleteUser(id) => format!("admin_delete_user_{}", id),
            Self::AddAdmin => "admin_add".to_string(),
            Self::RemoveAdminMenu => "admin_remove".to_string(),
            Self::RemoveAdmin(id) => format!("admin_remove_id_{}", id),
            Self::ManageSlotsMenu => "admin_slots".to_string(),
            Self::AddSlotPrompt => "admin_add_slot".to_string(),
            Self::ViewSlots => "admin_view_slots".to_string(),
            Self::ManageDoctorsMenu => "admin_doctors".to_string(),
            Self::AddDoctorPrompt => "admin_add_doctor".to_string(),
            Self::ViewDoctors => "admin_view_doctors".to_string(),
            Self::SystemStats => "admin_stats".to_string(),
            Self::BroadcastPrompt => "admin_broadcast".to_string(),
        }
    }

    /// Commands only a registered administrator may run.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Self::Health
                | Self::AdminPanel
                | Self::UserMode
                | Self::ListBookings
                | Self::ManageBooking(_)
                | Self::AdminCancelBooking(_)
                | Self::ListUsers
                | Self::ManageUser(_)
                | Self::EditUser(_)
                | Self::DeleteUser(_)
                | Self::AddAdmin
                | Self::RemoveAdminMenu
                | Self::RemoveAdmin(_)
                | Self::ManageSlotsMenu
                | Self::AddSlotPrompt
                | Self::ViewSlots
                | Self::ManageDoctorsMenu
                | Self::AddDoctorPrompt
                | Self::ViewDoctors
                | Self::SystemStats
                | Self::BroadcastPrompt
        )
    }

    /// Commands that start a new flow or navigate away, discarding whatever
    /// the user was entering. Decisions, lookups and listings leave the
    /// current conversation untouched.
    pub fn replaces_state(&self) -> bool {
        matches!(
            self,
            Self::Start
                | Self::Reset
                | Self::Book
                | Self::SelectDoctor
                | Self::SelectDoctorId(_)
                | Self::SelectSlot { .. }
                | Self::BookForSelf
                | Self::BookForCaregiver
                | Self::Support
                | Self::AdminPanel
                | Self::UserMode
                | Self::EditUser(_)
                | Self::AddAdmin
                | Self::RemoveAdminMenu
                | Self::ManageSlotsMenu
                | Self::AddSlotPrompt
                | Self::ManageDoctorsMenu
                | Self::AddDoctorPrompt
                | Self::BroadcastPrompt
        )
    }
}
