// libs/conversation-cell/src/menus.rs
use std::collections::BTreeMap;

use chrono::NaiveDate;

use shared_config::AppConfig;
use shared_models::{
    Action, Booking, BookingId, BookingStatus, DeliveryFailure, Doctor, OutboundMessage, Slot, SlotListing,
    SystemStats, UserId, UserProfile,
};
use shared_utils::dates::day_name;

use crate::commands::Command;

pub const USE_BUTTONS: &str = "⚠️ Please use the provided buttons or commands.";
pub const INVALID_ACTION: &str = "⚠️ Invalid action. Please use the provided buttons.";
pub const GENERIC_ERROR: &str = "⚠️ An error occurred. Please try again or use /start to reset.";
pub const UNAUTHORIZED: &str = "⚠️ Unauthorized access.";
pub const RESET_DONE: &str = "✅ Conversation reset. Use /start to begin again.";
pub const ASK_PATIENT_NAME: &str = "📝 Please provide the patient's full name for the booking.";
pub const ASK_DATE_OF_BIRTH: &str =
    "📅 Please provide the patient's date of birth (format: YYYY-MM-DD, e.g., 1980-01-01).";
pub const INVALID_DATE_OF_BIRTH: &str = "Invalid date format. Please use YYYY-MM-DD (e.g., 1980-01-01).";
pub const FUTURE_DATE_OF_BIRTH: &str =
    "⚠️ The date of birth cannot be in the future. Please use YYYY-MM-DD (e.g., 1980-01-01).";
pub const SLOT_GONE: &str = "⚠️ This slot is no longer available. Please select another slot.";
pub const ASK_CAREGIVER_NAME: &str = "Please provide the name of the patient you are managing for.";
pub const NO_DOCTORS: &str = "⚠️ No doctors available. Please contact support.";
pub const DOCTOR_NOT_FOUND: &str = "⚠️ Doctor not found.";
pub const BOOKING_NOT_FOUND: &str = "⚠️ Booking not found.";
pub const USER_NOT_FOUND: &str = "⚠️ User not found.";
pub const SUPPORT_SUBMITTED: &str = "✅ Your support request has been submitted. Our team will contact you soon.";

pub const ASK_NEW_ADMIN: &str = "Enter the Telegram User ID of the new admin:";
pub const INVALID_USER_ID: &str = "Please enter a valid Telegram User ID.";
pub const SLOT_FORMAT: &str = "Invalid format. Use: date,time_slot,doctor_id (e.g., 2025-04-23,09:00,987654321)";
pub const DOCTOR_FORMAT: &str = "Invalid format. Use: user_id,name (e.g., 987654321,Dr. Martin)";
pub const ASK_BROADCAST: &str = "Enter the broadcast message to send to all users:";

fn button(label: impl Into<String>, command: Command) -> Action {
    Action::new(label, command.callback_data())
}

pub fn text(text: impl Into<String>) -> OutboundMessage {
    OutboundMessage::text(text)
}

pub fn welcome(config: &AppConfig, is_admin: bool) -> OutboundMessage {
    if is_admin {
        return text(format!(
            "👋 Welcome, Admin! Access the Admin Panel to manage the {}.\nYou can also switch to user features if needed.",
            config.service_name
        ))
        .with_action(button("Admin Panel", Command::AdminPanel))
        .with_action(button("Access User Features", Command::UserMode));
    }

    with_user_actions(text(format!(
        "👋 Welcome to {} – professional care over the phone.\n📞 This service uses a Swiss premium number: {}\nWould you like to book a call?",
        config.service_name, config.service_phone
    )))
}

fn with_user_actions(message: OutboundMessage) -> OutboundMessage {
    message
        .with_action(button("Book Now", Command::Book))
        .with_action(button("Cancel Booking", Command::CancelBookingMenu))
        .with_action(button("Service Info", Command::Info))
        .with_action(button("Contact Support", Command::Support))
}

pub fn user_mode() -> OutboundMessage {
    with_user_actions(text("Switched to user mode. Select an action:"))
        .with_action(button("Back to Admin Panel", Command::AdminPanel))
}

pub fn admin_panel() -> OutboundMessage {
    text("Admin Panel:")
        .with_row(vec![
            button("View Bookings", Command::ListBookings),
            button("Manage Users", Command::ListUsers),
            button("Add Admin", Command::AddAdmin),
        ])
        .with_row(vec![
            button("Remove Admin", Command::RemoveAdminMenu),
            button("Manage Slots", Command::ManageSlotsMenu),
            button("Manage Doctors", Command::ManageDoctorsMenu),
        ])
        .with_row(vec![
            button("System Stats", Command::SystemStats),
            button("Broadcast", Command::BroadcastPrompt),
            button("Back", Command::Start),
        ])
}

pub fn booking_for_whom() -> OutboundMessage {
    text("Are you booking for yourself or managing for someone else?")
        .with_action(button("For myself", Command::BookForSelf))
        .with_action(button("For a loved one", Command::BookForCaregiver))
}

pub fn doctor_picker(doctors: &[Doctor]) -> OutboundMessage {
    doctors.iter().fold(
        text("👨‍⚕️ Please select a doctor to view their schedule:"),
        |message, doctor| message.with_action(button(doctor.name.clone(), Command::SelectDoctorId(doctor.user_id))),
    )
}

pub fn no_slots(doctor: &Doctor) -> OutboundMessage {
    text(format!(
        "⚠️ No available slots for {}. Please try another doctor or contact support.",
        doctor.name
    ))
    .with_action(button("Back to Doctors", Command::SelectDoctor))
}

/// Slots grouped by day, one button per slot. Expects slots sorted by
/// (date, time).
pub fn calendar(doctor: &Doctor, slots: &[Slot], horizon_days: i64) -> OutboundMessage {
    let mut by_date: BTreeMap<NaiveDate, Vec<&Slot>> = BTreeMap::new();
    for slot in slots {
        by_date.entry(slot.booking_date).or_default().push(slot);
    }

    let mut body = format!("📅 {}'s Schedule (Next {} Days)\n\n", doctor.name, horizon_days);
    for (date, day_slots) in &by_date {
        body.push_str(&format!("🗓️ {} ({})\n", date, day_name(*date)));
        for slot in day_slots {
            body.push_str(&format!("- {} ✅\n", slot.time_slot));
        }
        body.push('\n');
    }
    body.push_str("Select a slot to book:");

    slots
        .iter()
        .fold(text(body), |message, slot| {
            message.with_action(button(
                format!("{} {}", slot.booking_date.format("%a %d.%m."), slot.time_slot),
                Command::SelectSlot {
                    time_slot: slot.time_slot.clone(),
                    date: slot.booking_date,
                    doctor_id: slot.doctor_id,
                },
            ))
        })
        .with_action(button("Back to Doctors", Command::SelectDoctor))
}

pub fn slot_gone() -> OutboundMessage {
    text(SLOT_GONE).with_action(button("Back to Doctors", Command::SelectDoctor))
}

/// Approve and reject buttons for a pending booking.
pub fn decision_actions(booking_id: BookingId) -> Vec<Action> {
    vec![
        button("Approve", Command::ApproveBooking(booking_id)),
        button("Reject", Command::RejectBooking(booking_id)),
    ]
}

pub fn booking_submitted(booking: &Booking) -> OutboundMessage {
    text(format!(
        "📝 Booking request for {} (DOB: {}) on {} at {} submitted.\nYou will be notified once the doctor approves.",
        booking.patient_name, booking.patient_dob, booking.booking_date, booking.time_slot
    ))
}

/// What the patient is told when the doctor could not be reached. The
/// booking already exists at this point, so no variant asks for a retry.
pub fn doctor_unreachable(failure: &DeliveryFailure) -> OutboundMessage {
    text(match failure {
        DeliveryFailure::Unreachable(_) => {
            "⚠️ Doctor's Telegram account not found. Your request is recorded and our team has been alerted."
        }
        DeliveryFailure::Blocked => {
            "⚠️ Bot is blocked by the doctor. Your request is recorded and our team has been alerted."
        }
        DeliveryFailure::RateLimited { .. } => {
            "⏳ Telegram is briefly limiting the bot, so the doctor was not notified yet. Your request is recorded and our team will pass it on. No need to book again."
        }
        DeliveryFailure::Other(_) => {
            "⚠️ The doctor could not be notified automatically. Your request is recorded and our team will contact the doctor. No need to book again."
        }
    })
}

/// Transient reply for a rate-limited operation.
pub fn rate_limited(retry_after_secs: Option<u64>) -> OutboundMessage {
    match retry_after_secs {
        Some(secs) => text(format!(
            "⏳ Bot is temporarily rate-limited. Please try again in {} seconds.",
            secs
        )),
        None => text("⏳ Bot is temporarily rate-limited. Please try again in a moment."),
    }
}

pub fn cancel_menu(bookings: &[Booking]) -> OutboundMessage {
    if bookings.is_empty() {
        return text("You have no active bookings to cancel.");
    }
    bookings.iter().fold(text("Select a booking to cancel:"), |message, booking| {
        message.with_action(button(
            format!("{} at {} on {}", booking.patient_name, booking.time_slot, booking.booking_date),
            Command::CancelBooking(booking.id),
        ))
    })
}

pub fn info(config: &AppConfig, doctors: &[Doctor]) -> OutboundMessage {
    let doctor_list = if doctors.is_empty() {
        "No doctors available at the moment.".to_string()
    } else {
        doctors
            .iter()
            .map(|d| format!("- {}", d.name))
            .collect::<Vec<_>>()
            .join("\n")
    };
    text(format!(
        "ℹ️ {}\n\nWe provide professional medical consultations via phone using a Swiss premium number: {}.\n\n🕒 Availability: Monday to Friday, 9:00–17:00\n👨‍⚕️ Our Doctors:\n{}\n\nAll our doctors are Swiss-certified, ensuring high-quality care.",
        config.service_name, config.service_phone, doctor_list
    ))
}

pub fn support_prompt(config: &AppConfig) -> OutboundMessage {
    text(format!(
        "📧 Please describe your issue or question, and our support team will get back to you.\nYou can also contact us at {}.",
        config.support_contact
    ))
}

pub fn health(stats: &SystemStats) -> OutboundMessage {
    text(format!(
        "✅ Database: Connected\n📊 Total Bookings: {}\n👥 Active Users: {}\n👨‍⚕️ Doctors: {}",
        stats.total_bookings, stats.active_users, stats.total_doctors
    ))
}

pub fn stats(stats: &SystemStats) -> OutboundMessage {
    text(format!(
        "📊 System Statistics:\nTotal Bookings: {}\nActive Users: {}\nAdmins: {}\nDoctors: {}",
        stats.total_bookings, stats.active_users, stats.total_admins, stats.total_doctors
    ))
}

pub fn booking_list(bookings: &[Booking]) -> OutboundMessage {
    if bookings.is_empty() {
        return text("No bookings found.");
    }
    bookings.iter().fold(text("Select a booking to manage:"), |message, booking| {
        message.with_action(button(
            format!(
                "ID: {} - {} ({} {}) [{}]",
                booking.id, booking.patient_name, booking.booking_date, booking.time_slot, booking.status
            ),
            Command::ManageBooking(booking.id),
        ))
    })
}

pub fn booking_detail(booking: &Booking) -> OutboundMessage {
    let message = text(format!(
        "Booking ID: {}\nUser ID: {}\nPatient: {}\nDOB: {}\nSlot: {} on {}\nDoctor ID: {}\nStatus: {}",
        booking.id,
        booking.user_id,
        booking.patient_name,
        booking.patient_dob,
        booking.time_slot,
        booking.booking_date,
        booking.doctor_id,
        booking.status
    ));
    let message = match booking.status {
        BookingStatus::Pending => message.with_row(decision_actions(booking.id)),
        BookingStatus::Approved => {
            message.with_action(button("Cancel Booking", Command::AdminCancelBooking(booking.id)))
        }
        BookingStatus::Rejected | BookingStatus::Cancelled => message,
    };
    message.with_action(button("Back to Bookings", Command::ListBookings))
}

pub fn user_list(users: &[UserProfile]) -> OutboundMessage {
    if users.is_empty() {
        return text("No users found.");
    }
    users.iter().fold(text("Select a user to manage:"), |message, user| {
        message.with_action(button(format!("User ID: {}", user.user_id), Command::ManageUser(user.user_id)))
    })
}

pub fn user_detail(user: &UserProfile) -> OutboundMessage {
    text(format!(
        "User ID: {}\nCaregiver: {}\nLinked Patient: {}\nLanguage: {}",
        user.user_id,
        if user.is_caregiver { "Yes" } else { "No" },
        user.linked_patient.as_deref().unwrap_or("None"),
        user.language
    ))
    .with_action(button("Edit User", Command::EditUser(user.user_id)))
    .with_action(button("Delete User", Command::DeleteUser(user.user_id)))
    .with_action(button("Back to Users", Command::ListUsers))
}

pub fn user_edit_prompt() -> OutboundMessage {
    text("Enter new user details (format: is_caregiver,linked_patient)\nExample: 1,John Doe")
}

pub fn admin_removal_menu(admins: &[UserId]) -> OutboundMessage {
    if admins.is_empty() {
        return text("No admins to remove.");
    }
    admins.iter().fold(
        text("Select an admin to remove, or type their Telegram User ID:"),
        |message, admin_id| message.with_action(button(format!("Admin ID: {}", admin_id), Command::RemoveAdmin(*admin_id))),
    )
}

pub fn slots_menu() -> OutboundMessage {
    text("Manage Doctor Slots:")
        .with_action(button("Add Doctor Slot", Command::AddSlotPrompt))
        .with_action(button("View Doctor Slots", Command::ViewSlots))
        .with_action(button("Back to Admin Panel", Command::AdminPanel))
}

pub fn slot_prompt(config: &AppConfig) -> OutboundMessage {
    text(format!(
        "Enter the new doctor slot details (format: date,time_slot,doctor_id)\nExample: 2025-04-23,09:00,987654321\nOffered times: {}",
        config.offered_time_slots.join(", ")
    ))
}

pub fn slot_listing(listings: &[SlotListing]) -> OutboundMessage {
    if listings.is_empty() {
        return text("No available doctor slots found.");
    }
    let mut body = "Available Doctor Slots:\n".to_string();
    for listing in listings {
        body.push_str(&format!(
            "{} ({}), {} with {}\n",
            listing.slot.booking_date,
            day_name(listing.slot.booking_date),
            listing.slot.time_slot,
            listing.doctor_name
        ));
    }
    text(body.trim_end())
}

pub fn doctors_menu() -> OutboundMessage {
    text("Manage Doctors:")
        .with_action(button("Add Doctor", Command::AddDoctorPrompt))
        .with_action(button("View Doctors", Command::ViewDoctors))
        .with_action(button("Back to Admin Panel", Command::AdminPanel))
}

pub fn doctor_prompt() -> OutboundMessage {
    text("Enter the new doctor details (format: user_id,name)\nExample: 987654321,Dr. Martin")
}

pub fn doctor_listing(doctors: &[Doctor]) -> OutboundMessage {
    if doctors.is_empty() {
        return text("No doctors found.");
    }
    let mut body = "Registered Doctors:\n".to_string();
    for doctor in doctors {
        body.push_str(&format!("ID: {}, Name: {}\n", doctor.user_id, doctor.name));
    }
    text(body.trim_end())
}
