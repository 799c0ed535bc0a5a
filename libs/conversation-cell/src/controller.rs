// libs/conversation-cell/src/controller.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use admin_cell::AdminError;
use appointment_cell::{BookingError, CancelledBy, Decision};
use shared_models::{AppError, BookingId, Language, NewBooking, OutboundMessage, SlotKey, UserId, UserProfile};
use shared_utils::dates::parse_iso_date;

use crate::commands::Command;
use crate::context::ServiceContext;
use crate::menus::{self, text};
use crate::models::{ConversationState, Event, Inbound};
use crate::session::{ConversationSession, SessionStore};

pub(crate) type Replies = Result<Vec<OutboundMessage>, AppError>;

/// Who sent the event being handled.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Actor<'a> {
    pub user_id: UserId,
    pub username: Option<&'a str>,
    pub is_admin: bool,
}

/// Turns inbound events into replies, one user at a time.
pub struct ConversationController {
    pub(crate) ctx: Arc<ServiceContext>,
    sessions: SessionStore,
}

impl ConversationController {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            sessions: SessionStore::new(),
        }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Every event gets at least one reply. Errors are turned into replies
    /// here and a storage failure drops the conversation.
    #[instrument(skip(self, event), fields(user_id = event.user_id))]
    pub async fn handle(&self, event: Event) -> Vec<OutboundMessage> {
        let session = self.sessions.session(event.user_id).await;
        let mut session = session.lock().await;

        match self.dispatch(&mut session, &event).await {
            Ok(replies) => replies,
            Err(err) => recover(&mut session, err),
        }
    }

    async fn dispatch(&self, session: &mut ConversationSession, event: &Event) -> Replies {
        let is_admin = self.ctx.admin.is_admin(event.user_id).await?;
        let actor = Actor {
            user_id: event.user_id,
            username: event.username.as_deref(),
            is_admin,
        };

        match &event.input {
            Inbound::Command(command) => {
                if command.requires_admin() && !actor.is_admin {
                    warn!("User {} tried admin command {:?}", actor.user_id, command);
                    return Ok(vec![text(menus::UNAUTHORIZED)]);
                }
                info!("User {} triggered {}", actor.user_id, command.callback_data());
                if command.replaces_state() {
                    session.reset();
                }
                self.on_command(session, actor, command.clone()).await
            }
            Inbound::Text(input) => self.on_text(session, actor, input.trim()).await,
            Inbound::Unrecognized(raw) => {
                debug!("Unrecognized input from {}: {}", actor.user_id, raw);
                Ok(vec![text(menus::INVALID_ACTION)])
            }
        }
    }

    async fn on_command(&self, session: &mut ConversationSession, actor: Actor<'_>, command: Command) -> Replies {
        match command {
            Command::Start => Ok(vec![menus::welcome(&self.ctx.config, actor.is_admin)]),
            Command::Reset => Ok(vec![text(menus::RESET_DONE)]),
            Command::Health => Ok(vec![self.health().await]),
            Command::SetLanguage(code) => self.set_language(actor, &code).await,
            Command::Book => self.start_booking(session, actor).await,
            Command::SelectDoctor => self.show_doctors(session).await,
            Command::SelectDoctorId(doctor_id) => self.show_calendar(session, doctor_id).await,
            Command::SelectSlot {
                time_slot,
                date,
                doctor_id,
            } => self.choose_slot(session, SlotKey::new(doctor_id, date, time_slot)).await,
            Command::CancelBookingMenu => {
                let bookings = self.ctx.ledger.list_for_user(actor.user_id).await?;
                Ok(vec![menus::cancel_menu(&bookings)])
            }
            Command::CancelBooking(booking_id) => self.cancel_booking(actor, booking_id).await,
            Command::BookForSelf => self.register_self(session, actor).await,
            Command::BookForCaregiver => {
                session.transition(ConversationState::CollectingCaregiverName);
                Ok(vec![text(menus::ASK_CAREGIVER_NAME)])
            }
            Command::ApproveBooking(booking_id) => self.decide(actor, booking_id, Decision::Approve).await,
            Command::RejectBooking(booking_id) => self.decide(actor, booking_id, Decision::Reject).await,
            Command::Info => {
                let doctors = self.ctx.doctors.list_doctors().await?;
                Ok(vec![menus::info(&self.ctx.config, &doctors)])
            }
            Command::Support => {
                session.transition(ConversationState::AwaitingSupportText);
                Ok(vec![menus::support_prompt(&self.ctx.config)])
            }
            Command::AdminPanel => Ok(vec![menus::admin_panel()]),
            Command::UserMode => Ok(vec![menus::user_mode()]),
            admin @ (Command::ListBookings
            | Command::ManageBooking(_)
            | Command::AdminCancelBooking(_)
            | Command::ListUsers
            | Command::ManageUser(_)
            | Command::EditUser(_)
            | Command::DeleteUser(_)
            | Command::AddAdmin
            | Command::RemoveAdminMenu
            | Command::RemoveAdmin(_)
            | Command::ManageSlotsMenu
            | Command::AddSlotPrompt
            | Command::ViewSlots
            | Command::ManageDoctorsMenu
            | Command::AddDoctorPrompt
            | Command::ViewDoctors
            | Command::SystemStats
            | Command::BroadcastPrompt) => self.on_admin_command(session, admin).await,
        }
    }

    async fn on_text(&self, session: &mut ConversationSession, actor: Actor<'_>, input: &str) -> Replies {
        match session.state.clone() {
            ConversationState::Idle | ConversationState::SelectingDoctor | ConversationState::SelectingSlot { .. } => {
                Ok(vec![text(menus::USE_BUTTONS)])
            }
            ConversationState::CollectingCaregiverName => self.register_caregiver(session, actor, input).await,
            ConversationState::CollectingPatientName { slot } => {
                if input.is_empty() {
                    return Ok(vec![text(menus::ASK_PATIENT_NAME)]);
                }
                session.transition(ConversationState::CollectingDateOfBirth {
                    slot,
                    patient_name: input.to_string(),
                });
                Ok(vec![text(menus::ASK_DATE_OF_BIRTH)])
            }
            ConversationState::CollectingDateOfBirth { slot, patient_name } => {
                self.submit_booking(session, actor, slot, patient_name, input).await
            }
            ConversationState::AwaitingSupportText => {
                match self.ctx.support.submit(actor.user_id, actor.username, input).await {
                    Ok(_) => {
                        session.reset();
                        Ok(vec![text(menus::SUPPORT_SUBMITTED)])
                    }
                    Err(AdminError::InvalidPayload(_)) => Ok(vec![menus::support_prompt(&self.ctx.config)]),
                    Err(e) => Err(e.into()),
                }
            }
            ConversationState::AwaitingAdminInput(kind) => {
                if !actor.is_admin {
                    session.reset();
                    return Ok(vec![text(menus::UNAUTHORIZED)]);
                }
                self.on_admin_input(session, kind, input).await
            }
        }
    }

    async fn health(&self) -> OutboundMessage {
        let report = self.ctx.admin.health().await;
        match report.stats {
            Some(stats) if report.storage_ok => menus::health(&stats),
            _ => text(format!(
                "⚠️ Health check failed: {}",
                report.detail.unwrap_or_else(|| "unknown error".to_string())
            )),
        }
    }

    async fn set_language(&self, actor: Actor<'_>, code: &str) -> Replies {
        let codes = Language::ALL.iter().map(|l| l.code()).collect::<Vec<_>>().join(", ");
        if code.trim().is_empty() {
            return Ok(vec![text(format!("Usage: /language <code> ({})", codes))]);
        }
        let Some(language) = Language::from_code(code) else {
            return Ok(vec![text(format!(
                "⚠️ Unsupported language '{}'. Choose one of: {}.",
                code.trim(),
                codes
            ))])
        };
        let Some(mut profile) = self.ctx.store.get_profile(actor.user_id).await? else {
            return Ok(vec![text("⚠️ No profile yet. Use /start and book a call first.")]);
        };

        profile.language = language;
        self.ctx.store.upsert_profile(&profile).await?;
        info!("User {} switched language to {}", actor.user_id, language);
        Ok(vec![text(format!("✅ Language set to {}.", language))])
    }

    async fn preferred_language(&self, user_id: UserId) -> Result<Language, AppError> {
        Ok(match self.ctx.store.get_profile(user_id).await? {
            Some(profile) => profile.language,
            None => Language::from_code(&self.ctx.config.default_language).unwrap_or_default(),
        })
    }

    async fn start_booking(&self, session: &mut ConversationSession, actor: Actor<'_>) -> Replies {
        match self.ctx.store.get_profile(actor.user_id).await? {
            Some(_) => self.show_doctors(session).await,
            None => Ok(vec![menus::booking_for_whom()]),
        }
    }

    async fn register_self(&self, session: &mut ConversationSession, actor: Actor<'_>) -> Replies {
        let language = self.preferred_language(actor.user_id).await?;
        self.ctx
            .store
            .upsert_profile(&UserProfile::for_self(actor.user_id, language))
            .await?;
        info!("Registered user {} as booking for themselves", actor.user_id);
        self.show_doctors(session).await
    }

    async fn register_caregiver(&self, session: &mut ConversationSession, actor: Actor<'_>, patient: &str) -> Replies {
        if patient.is_empty() {
            return Ok(vec![text(menus::ASK_CAREGIVER_NAME)]);
        }
        let language = self.preferred_language(actor.user_id).await?;
        self.ctx
            .store
            .upsert_profile(&UserProfile::caregiver(actor.user_id, patient, language))
            .await?;
        info!("Registered user {} as caregiver", actor.user_id);

        let mut replies = vec![text(format!(
            "✅ Registered as caregiver for {}. You can now book calls on their behalf.",
            patient
        ))];
        replies.extend(self.show_doctors(session).await?);
        Ok(replies)
    }

    async fn show_doctors(&self, session: &mut ConversationSession) -> Replies {
        let doctors = self.ctx.doctors.list_doctors().await?;
        if doctors.is_empty() {
            warn!("No doctors registered");
            session.reset();
            return Ok(vec![text(menus::NO_DOCTORS)]);
        }
        session.transition(ConversationState::SelectingDoctor);
        Ok(vec![menus::doctor_picker(&doctors)])
    }

    async fn show_calendar(&self, session: &mut ConversationSession, doctor_id: UserId) -> Replies {
        let Some(doctor) = self.ctx.doctors.get_doctor(doctor_id).await? else {
            session.reset();
            return Ok(vec![text(menus::DOCTOR_NOT_FOUND)]);
        };

        let slots = self.ctx.availability.list_available_in_horizon(doctor_id).await?;
        if slots.is_empty() {
            info!("No available slots for doctor {}", doctor_id);
            session.transition(ConversationState::SelectingDoctor);
            return Ok(vec![menus::no_slots(&doctor)]);
        }

        session.transition(ConversationState::SelectingSlot { doctor_id });
        Ok(vec![menus::calendar(&doctor, &slots, self.ctx.config.booking_horizon_days)])
    }

    async fn choose_slot(&self, session: &mut ConversationSession, slot: SlotKey) -> Replies {
        if !self.ctx.availability.is_available(&slot).await? {
            info!("Slot {} is no longer available", slot);
            session.reset();
            return Ok(vec![menus::slot_gone()]);
        }
        session.transition(ConversationState::CollectingPatientName { slot });
        Ok(vec![text(menus::ASK_PATIENT_NAME)])
    }

    async fn submit_booking(
        &self,
        session: &mut ConversationSession,
        actor: Actor<'_>,
        slot: SlotKey,
        patient_name: String,
        input: &str,
    ) -> Replies {
        let Some(patient_dob) = parse_iso_date(input) else {
            return Ok(vec![text(menus::INVALID_DATE_OF_BIRTH)]);
        };
        if patient_dob > self.ctx.clock.today() {
            return Ok(vec![text(menus::FUTURE_DATE_OF_BIRTH)]);
        }

        session.reset();
        let request = NewBooking {
            user_id: actor.user_id,
            patient_name,
            patient_dob,
            slot,
        };
        let booking = match self.ctx.ledger.create_pending(request).await {
            Ok(booking) => booking,
            Err(BookingError::SlotTaken(key)) => {
                info!("User {} lost slot {} to another booking", actor.user_id, key);
                return Ok(vec![menus::slot_gone()]);
            }
            Err(e) => return Err(e.into()),
        };

        let report = self
            .ctx
            .workflow
            .request_approval(&booking, actor.username, menus::decision_actions(booking.id))
            .await;

        let mut replies = vec![menus::booking_submitted(&booking)];
        if let Some(failure) = report.doctor_outcome.failure() {
            replies.push(menus::doctor_unreachable(failure));
        }
        Ok(replies)
    }

    async fn cancel_booking(&self, actor: Actor<'_>, booking_id: BookingId) -> Replies {
        let booking = match self.ctx.ledger.get_by_id(booking_id).await {
            Ok(booking) => booking,
            Err(e) => return booking_reply(e, "Failed to cancel booking"),
        };
        let is_owner = booking.user_id == actor.user_id;
        if !is_owner && !actor.is_admin {
            warn!("User {} tried to cancel booking {} of user {}", actor.user_id, booking_id, booking.user_id);
            return Ok(vec![text("⚠️ You can only cancel your own bookings.")]);
        }

        let cancelled_by = if is_owner { CancelledBy::Patient } else { CancelledBy::Admin };
        match self.ctx.workflow.cancel(booking_id, cancelled_by).await {
            Ok(report) => {
                let booking = report.booking;
                let mut replies = vec![text(format!(
                    "✅ Booking for {} on {} at {} cancelled successfully.",
                    booking.patient_name, booking.booking_date, booking.time_slot
                ))];
                if !report.doctor_outcome.is_delivered() {
                    replies.push(text("⚠️ Booking cancelled, but failed to notify the doctor."));
                }
                Ok(replies)
            }
            Err(e) => booking_reply(e, "Failed to cancel booking"),
        }
    }

    pub(crate) async fn decide(&self, actor: Actor<'_>, booking_id: BookingId, decision: Decision) -> Replies {
        let booking = match self.ctx.ledger.get_by_id(booking_id).await {
            Ok(booking) => booking,
            Err(e) => return booking_reply(e, "Failed to update booking"),
        };
        if booking.doctor_id != actor.user_id && !actor.is_admin {
            warn!("User {} tried to decide booking {} of doctor {}", actor.user_id, booking_id, booking.doctor_id);
            return Ok(vec![text(
                "⚠️ Only the booking's doctor or an administrator can decide on this booking.",
            )]);
        }

        match self.ctx.workflow.decide(booking_id, decision).await {
            Ok(report) => {
                let mut replies = vec![text(match decision {
                    Decision::Approve => format!("✅ Booking ID {} approved. User and doctor notified.", booking_id),
                    Decision::Reject => format!("✅ Booking ID {} rejected. User notified.", booking_id),
                })];
                if !report.patient_outcome.is_delivered() {
                    replies.push(text("⚠️ The patient could not be notified."));
                }
                Ok(replies)
            }
            Err(BookingError::AlreadyDecided { status }) => Ok(vec![text(format!(
                "ℹ️ Booking ID {} has already been {}.",
                booking_id, status
            ))]),
            Err(e) => booking_reply(e, "Failed to update booking"),
        }
    }
}

/// Booking conflicts become replies; storage failures propagate.
pub(crate) fn booking_reply(err: BookingError, context: &str) -> Replies {
    match err {
        BookingError::Storage(e) => Err(e.into()),
        BookingError::NotFound(_) => Ok(vec![text(menus::BOOKING_NOT_FOUND)]),
        other => Ok(vec![text(format!("⚠️ {}: {}", context, other))]),
    }
}

fn recover(session: &mut ConversationSession, err: AppError) -> Vec<OutboundMessage> {
    err.log();
    let reply = match &err {
        AppError::RateLimited { retry_after_secs } => menus::rate_limited(*retry_after_secs),
        AppError::Storage(_) => text(menus::GENERIC_ERROR),
        AppError::Unauthorized(_) => text(menus::UNAUTHORIZED),
        AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => text(format!("⚠️ {}", msg)),
        AppError::Delivery(failure) => text(format!("⚠️ A message could not be delivered: {}", failure)),
    };
    if err.clears_session() || matches!(err, AppError::NotFound(_) | AppError::Conflict(_)) {
        session.reset();
    }
    vec![reply]
}
