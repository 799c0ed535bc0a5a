// libs/appointment-cell/src/services/approval.rs
use std::sync::Arc;

use tracing::{info, instrument, warn};

use doctor_cell::DoctorService;
use notification_cell::{DeliveryOutcome, NotificationDispatcher};
use shared_config::AppConfig;
use shared_models::{Action, Booking, BookingId, OutboundMessage, UserId};
use shared_utils::dates::{day_name, describe_day};
use shared_utils::Clock;

use crate::models::{ApprovalRequestReport, BookingError, Decision, DecisionReport};
use crate::services::booking::BookingLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelledBy {
    Patient,
    Admin,
}

#[derive(Debug, Clone)]
pub struct CancellationReport {
    pub booking: Booking,
    pub doctor_outcome: DeliveryOutcome,
    /// Only set when someone other than the patient cancelled.
    pub patient_outcome: Option<DeliveryOutcome>,
    pub escalated: bool,
}

/// Doctor-mediated accept/reject step plus the notifications around it.
/// Ledger changes are never rolled back because a message failed.
pub struct ApprovalWorkflow {
    ledger: Arc<BookingLedger>,
    doctors: Arc<DoctorService>,
    notifications: Arc<NotificationDispatcher>,
    config: Arc<AppConfig>,
    clock: Arc<dyn Clock>,
}

impl ApprovalWorkflow {
    pub fn new(
        ledger: Arc<BookingLedger>,
        doctors: Arc<DoctorService>,
        notifications: Arc<NotificationDispatcher>,
        config: Arc<AppConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            doctors,
            notifications,
            config,
            clock,
        }
    }

    /// Sends the new pending booking to its doctor with approve/reject
    /// actions. An undeliverable request is escalated to administrators.
    #[instrument(skip(self, booking, decision_actions), fields(booking_id = booking.id))]
    pub async fn request_approval(
        &self,
        booking: &Booking,
        username: Option<&str>,
        decision_actions: Vec<Action>,
    ) -> ApprovalRequestReport {
        let text = format!(
            "🔔 New booking request:\nPatient: {}\nDOB: {}\nDate: {} ({})\nTime: {}\nUser ID: {}\nUsername: {}\nPlease approve or reject the booking.",
            booking.patient_name,
            booking.patient_dob,
            booking.booking_date,
            day_name(booking.booking_date),
            booking.time_slot,
            booking.user_id,
            username.unwrap_or("N/A"),
        );
        let message = OutboundMessage::text(text).with_row(decision_actions);

        let doctor_outcome = self.notifications.send(booking.doctor_id, &message).await;
        let escalated = self.escalate_doctor_failure(booking, &doctor_outcome).await;

        ApprovalRequestReport {
            booking: booking.clone(),
            doctor_outcome,
            escalated,
        }
    }

    /// Applies the doctor's decision. A second decision on the same booking
    /// fails with `AlreadyDecided` and sends nothing.
    #[instrument(skip(self))]
    pub async fn decide(&self, booking_id: BookingId, decision: Decision) -> Result<DecisionReport, BookingError> {
        self.ledger.get_by_id(booking_id).await?;

        let booking = match decision {
            Decision::Approve => self.ledger.approve(booking_id).await?,
            Decision::Reject => self.ledger.reject(booking_id).await?,
        };
        info!("Booking {} {} by doctor", booking.id, booking.status);

        let report = match decision {
            Decision::Approve => {
                let doctor_name = self.doctor_name(booking.doctor_id).await;
                let patient_text = format!(
                    "✅ Your call with {} is scheduled {} at {}. Please call {} at that time.",
                    doctor_name,
                    describe_day(booking.booking_date, self.clock.today()),
                    booking.time_slot,
                    self.config.service_phone,
                );
                let doctor_text = format!(
                    "✅ Booking confirmed for {} on {} ({}) at {}. Patient: {}\nDOB: {}\nUser ID: {}",
                    booking.patient_name,
                    booking.booking_date,
                    day_name(booking.booking_date),
                    booking.time_slot,
                    booking.patient_name,
                    booking.patient_dob,
                    booking.user_id,
                );

                let patient_outcome = self.notify_patient(&booking, patient_text).await;
                let doctor_outcome = self
                    .notifications
                    .send(booking.doctor_id, &OutboundMessage::text(doctor_text))
                    .await;
                let escalated = self.escalate_doctor_failure(&booking, &doctor_outcome).await;

                DecisionReport {
                    booking,
                    patient_outcome,
                    doctor_outcome: Some(doctor_outcome),
                    escalated,
                }
            }
            Decision::Reject => {
                let patient_text = format!(
                    "❌ Your booking for {} on {} at {} was rejected by the doctor. Please select another slot.",
                    booking.patient_name, booking.booking_date, booking.time_slot,
                );
                let patient_outcome = self.notify_patient(&booking, patient_text).await;

                DecisionReport {
                    booking,
                    patient_outcome,
                    doctor_outcome: None,
                    escalated: false,
                }
            }
        };

        Ok(report)
    }

    /// Cancels an approved booking, releasing its slot, and tells the doctor.
    /// Administrator cancellations also notify the patient.
    #[instrument(skip(self))]
    pub async fn cancel(&self, booking_id: BookingId, cancelled_by: CancelledBy) -> Result<CancellationReport, BookingError> {
        let booking = self.ledger.cancel(booking_id).await?;

        let doctor_text = format!(
            "🔔 Booking cancelled:\nPatient: {}\nDate: {}\nTime: {}",
            booking.patient_name, booking.booking_date, booking.time_slot
        );
        let doctor_outcome = self
            .notifications
            .send(booking.doctor_id, &OutboundMessage::text(doctor_text))
            .await;
        let escalated = self.escalate_doctor_failure(&booking, &doctor_outcome).await;

        let patient_outcome = match cancelled_by {
            CancelledBy::Patient => None,
            CancelledBy::Admin => {
                let text = format!(
                    "ℹ️ Your booking for {} on {} at {} has been cancelled by the service. Please book another slot if needed.",
                    booking.patient_name, booking.booking_date, booking.time_slot
                );
                Some(self.notify_patient(&booking, text).await)
            }
        };

        Ok(CancellationReport {
            booking,
            doctor_outcome,
            patient_outcome,
            escalated,
        })
    }

    async fn notify_patient(&self, booking: &Booking, text: String) -> DeliveryOutcome {
        let outcome = self
            .notifications
            .send(booking.user_id, &OutboundMessage::text(text))
            .await;
        if let Some(failure) = outcome.failure() {
            warn!(
                "Failed to notify user {} about booking {}: {}",
                booking.user_id, booking.id, failure
            );
        }
        outcome
    }

    async fn escalate_doctor_failure(&self, booking: &Booking, outcome: &DeliveryOutcome) -> bool {
        let Some(failure) = outcome.failure() else {
            return false;
        };
        self.notifications
            .escalate(&format!("booking ID {}", booking.id), booking.doctor_id, failure)
            .await;
        true
    }

    async fn doctor_name(&self, doctor_id: UserId) -> String {
        match self.doctors.display_name(doctor_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!("Could not load doctor {}: {}", doctor_id, e);
                "Doctor".to_string()
            }
        }
    }
}
