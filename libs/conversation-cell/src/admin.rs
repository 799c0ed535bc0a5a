// libs/conversation-cell/src/admin.rs
use tracing::{info, warn};

use admin_cell::{parse_user_id, AdminError};
use doctor_cell::AvailabilityError;
use shared_models::{AppError, OutboundMessage, UserId};

use crate::commands::Command;
use crate::controller::{booking_reply, ConversationController, Replies};
use crate::menus::{self, text};
use crate::models::{AdminInputKind, ConversationState};
use crate::session::ConversationSession;

impl ConversationController {
    /// Admin-only commands. The caller has already checked the role.
    pub(crate) async fn on_admin_command(&self, session: &mut ConversationSession, command: Command) -> Replies {
        let admin = &self.ctx.admin;
        let reply = match command {
            Command::ListBookings => menus::booking_list(&admin.list_bookings().await?),
            Command::ManageBooking(booking_id) => match admin.get_booking(booking_id).await {
                Ok(booking) => menus::booking_detail(&booking),
                Err(AdminError::Booking(e)) => return booking_reply(e, "Failed to load booking"),
                Err(e) => return Err(e.into()),
            },
            Command::AdminCancelBooking(booking_id) => match admin.cancel_booking(booking_id).await {
                Ok(report) => {
                    let mut replies = vec![text(format!("✅ Booking ID {} cancelled.", booking_id))];
                    if !report.doctor_outcome.is_delivered() {
                        replies.push(text("⚠️ Booking cancelled, but failed to notify the doctor."));
                    }
                    return Ok(replies);
                }
                Err(AdminError::Booking(e)) => return booking_reply(e, "Failed to cancel booking"),
                Err(e) => return Err(e.into()),
            },
            Command::ListUsers => menus::user_list(&admin.list_users().await?),
            Command::ManageUser(user_id) => match admin.get_user(user_id).await {
                Ok(user) => menus::user_detail(&user),
                Err(AdminError::UserNotFound(_)) => text(menus::USER_NOT_FOUND),
                Err(e) => return Err(e.into()),
            },
            Command::EditUser(user_id) => match admin.get_user(user_id).await {
                Ok(_) => {
                    session.transition(ConversationState::AwaitingAdminInput(AdminInputKind::EditUser { user_id }));
                    menus::user_edit_prompt()
                }
                Err(AdminError::UserNotFound(_)) => text(menus::USER_NOT_FOUND),
                Err(e) => return Err(e.into()),
            },
            Command::DeleteUser(user_id) => {
                let deletion = admin.delete_user(user_id).await?;
                let settled = deletion.cancelled.len() + deletion.rejected.len();
                if !deletion.profile_deleted && settled == 0 {
                    text(menus::USER_NOT_FOUND)
                } else if settled == 0 {
                    text(format!("✅ User ID {} deleted.", user_id))
                } else {
                    text(format!(
                        "✅ User ID {} deleted. Cancelled {} and rejected {} of their bookings.",
                        user_id,
                        deletion.cancelled.len(),
                        deletion.rejected.len()
                    ))
                }
            }
            Command::AddAdmin => {
                session.transition(ConversationState::AwaitingAdminInput(AdminInputKind::AddAdmin));
                text(menus::ASK_NEW_ADMIN)
            }
            Command::RemoveAdminMenu => {
                let admins = admin.list_admins().await?;
                if !admins.is_empty() {
                    session.transition(ConversationState::AwaitingAdminInput(AdminInputKind::RemoveAdminTarget));
                }
                menus::admin_removal_menu(&admins)
            }
            Command::RemoveAdmin(admin_id) => self.remove_admin(session, admin_id).await?,
            Command::ManageSlotsMenu => menus::slots_menu(),
            Command::AddSlotPrompt => {
                session.transition(ConversationState::AwaitingAdminInput(AdminInputKind::AddSlot));
                menus::slot_prompt(&self.ctx.config)
            }
            Command::ViewSlots => menus::slot_listing(&admin.list_available_slots().await?),
            Command::ManageDoctorsMenu => menus::doctors_menu(),
            Command::AddDoctorPrompt => {
                session.transition(ConversationState::AwaitingAdminInput(AdminInputKind::AddDoctor));
                menus::doctor_prompt()
            }
            Command::ViewDoctors => menus::doctor_listing(&admin.list_doctors().await?),
            Command::SystemStats => menus::stats(&admin.system_stats().await?),
            Command::BroadcastPrompt => {
                session.transition(ConversationState::AwaitingAdminInput(AdminInputKind::Broadcast));
                text(menus::ASK_BROADCAST)
            }
            other => {
                warn!("{:?} reached the admin handler", other);
                text(menus::INVALID_ACTION)
            }
        };
        Ok(vec![reply])
    }

    /// Structured text typed after an admin prompt. Malformed input keeps
    /// the prompt open.
    pub(crate) async fn on_admin_input(
        &self,
        session: &mut ConversationSession,
        kind: AdminInputKind,
        input: &str,
    ) -> Replies {
        let admin = &self.ctx.admin;
        let reply = match kind {
            AdminInputKind::AddAdmin => {
                let Ok(user_id) = parse_user_id(input) else {
                    return Ok(vec![text(menus::INVALID_USER_ID)]);
                };
                session.reset();
                if admin.add_admin(user_id).await? {
                    text(format!("✅ Admin ID {} added.", user_id))
                } else {
                    text(format!("ℹ️ User ID {} is already an admin.", user_id))
                }
            }
            AdminInputKind::RemoveAdminTarget => {
                let Ok(user_id) = parse_user_id(input) else {
                    return Ok(vec![text(menus::INVALID_USER_ID)]);
                };
                self.remove_admin(session, user_id).await?
            }
            AdminInputKind::EditUser { user_id } => match admin.edit_user(user_id, input).await {
                Ok(_) => {
                    session.reset();
                    text(format!("✅ User ID {} updated.", user_id))
                }
                Err(AdminError::InvalidPayload(reason)) => text(format!("⚠️ {}", reason)),
                Err(AdminError::UserNotFound(_)) => {
                    session.reset();
                    text(menus::USER_NOT_FOUND)
                }
                Err(e) => return Err(e.into()),
            },
            AdminInputKind::AddSlot => match admin.add_slot(input).await {
                Ok(slot) => {
                    session.reset();
                    text(format!(
                        "✅ Doctor slot added: {}, {} for Doctor ID {}",
                        slot.booking_date, slot.time_slot, slot.doctor_id
                    ))
                }
                Err(AdminError::InvalidPayload(_)) => text(menus::SLOT_FORMAT),
                Err(AdminError::Availability(
                    e @ (AvailabilityError::UnknownDoctor(_)
                    | AvailabilityError::InvalidDate(_)
                    | AvailabilityError::InvalidTimeOfDay(_)),
                )) => text(format!("⚠️ {}. Please check and try again.", e)),
                Err(e) => return Err(e.into()),
            },
            AdminInputKind::AddDoctor => match admin.add_doctor(input).await {
                Ok((doctor, true)) => {
                    session.reset();
                    text(format!("✅ Doctor added: {} (ID: {})", doctor.name, doctor.user_id))
                }
                Ok((doctor, false)) => {
                    session.reset();
                    text(format!(
                        "ℹ️ Doctor ID {} is already registered as {}.",
                        doctor.user_id, doctor.name
                    ))
                }
                Err(AdminError::InvalidPayload(_)) => text(menus::DOCTOR_FORMAT),
                Err(e) => return Err(e.into()),
            },
            AdminInputKind::Broadcast => {
                if input.is_empty() {
                    return Ok(vec![text(menus::ASK_BROADCAST)]);
                }
                session.reset();
                self.broadcast(input).await?
            }
        };
        Ok(vec![reply])
    }

    async fn remove_admin(
        &self,
        session: &mut ConversationSession,
        admin_id: UserId,
    ) -> Result<OutboundMessage, AppError> {
        let closes_prompt = matches!(
            session.state,
            ConversationState::AwaitingAdminInput(AdminInputKind::RemoveAdminTarget)
        );
        Ok(match self.ctx.admin.remove_admin(admin_id).await {
            Ok(()) => {
                if closes_prompt {
                    session.reset();
                }
                text(format!("✅ Admin ID {} removed.", admin_id))
            }
            Err(AdminError::LastAdmin) => {
                if closes_prompt {
                    session.reset();
                }
                text("⚠️ Cannot remove the last administrator.")
            }
            Err(AdminError::NotAnAdmin(_)) => text(format!("⚠️ User ID {} is not an admin.", admin_id)),
            Err(e) => return Err(e.into()),
        })
    }

    async fn broadcast(&self, message: &str) -> Result<OutboundMessage, AppError> {
        let recipients: Vec<_> = self
            .ctx
            .admin
            .list_users()
            .await?
            .into_iter()
            .map(|user| user.user_id)
            .collect();

        let announcement = OutboundMessage::text(format!("📢 Announcement: {}", message));
        let report = self.ctx.notifications.broadcast(&recipients, &announcement).await;
        info!(
            "Broadcast finished: {} delivered, {} failed",
            report.success, report.failure
        );

        Ok(text(format!(
            "✅ Broadcast sent to {} users.\n❌ Failed to send to {} users.",
            report.success, report.failure
        )))
    }
}
