use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;

use appointment_cell::{ApprovalWorkflow, BookingError, BookingLedger, CancelledBy, Decision};
use doctor_cell::{AvailabilityService, DoctorService};
use notification_cell::NotificationDispatcher;
use shared_database::BookingStore;
use shared_models::{Action, Booking, BookingStatus, DeliveryFailure, NewBooking};
use shared_utils::test_utils::{
    RecordingMessenger, TestFixtures, ADMIN_ID, DOCTOR_MARTIN, PATIENT_ID, SECOND_PATIENT_ID,
};

struct Harness {
    fixtures: TestFixtures,
    messenger: Arc<RecordingMessenger>,
    ledger: Arc<BookingLedger>,
    availability: AvailabilityService,
    workflow: ApprovalWorkflow,
}

impl Harness {
    async fn new() -> Self {
        let fixtures = TestFixtures::new().await;
        let messenger = Arc::new(RecordingMessenger::new());
        let store = fixtures.dyn_store();
        let ledger = Arc::new(BookingLedger::new(store.clone()));
        let notifications = Arc::new(NotificationDispatcher::new(
            messenger.clone(),
            store.clone(),
            &fixtures.config,
        ));
        let workflow = ApprovalWorkflow::new(
            ledger.clone(),
            Arc::new(DoctorService::new(store.clone())),
            notifications,
            fixtures.config.clone(),
            fixtures.clock.clone(),
        );
        let availability = AvailabilityService::new(store, fixtures.config.clone(), fixtures.clock.clone());

        Self {
            fixtures,
            messenger,
            ledger,
            availability,
            workflow,
        }
    }

    async fn book(&self, user_id: i64) -> Result<Booking, BookingError> {
        self.ledger
            .create_pending(NewBooking {
                user_id,
                patient_name: "Anna Keller".to_string(),
                patient_dob: NaiveDate::from_ymd_opt(1980, 2, 14).unwrap(),
                slot: self.fixtures.martin_nine(),
            })
            .await
    }

    async fn slot_flag(&self) -> bool {
        self.fixtures
            .store
            .get_slot(&self.fixtures.martin_nine())
            .await
            .unwrap()
            .unwrap()
            .is_available
    }
}

fn decision_row(booking: &Booking) -> Vec<Action> {
    vec![
        Action::new("Approve", format!("approve_booking_{}", booking.id)),
        Action::new("Reject", format!("reject_booking_{}", booking.id)),
    ]
}

#[tokio::test]
async fn test_scenario_a_pending_booking_keeps_slot_open() {
    let h = Harness::new().await;
    assert!(h.availability.is_available(&h.fixtures.martin_nine()).await.unwrap());

    let booking = h.book(PATIENT_ID).await.unwrap();

    assert_eq!(booking.status, BookingStatus::Pending);
    assert!(!booking.confirmed);
    assert!(h.slot_flag().await);
}

#[tokio::test]
async fn test_scenario_b_approval_holds_slot_and_notifies_both() {
    let h = Harness::new().await;
    let booking = h.book(PATIENT_ID).await.unwrap();

    let report = h.workflow.decide(booking.id, Decision::Approve).await.unwrap();

    assert_eq!(report.booking.status, BookingStatus::Approved);
    assert!(report.booking.confirmed);
    assert!(!h.slot_flag().await);
    assert!(!report.escalated);

    let to_patient = h.messenger.sent_to(PATIENT_ID);
    let to_doctor = h.messenger.sent_to(DOCTOR_MARTIN);
    assert_eq!(to_patient.len(), 1);
    assert_eq!(to_doctor.len(), 1);
    assert_eq!(
        to_patient[0].text,
        "✅ Your call with Dr. Martin is scheduled on 2025-04-23 (Wednesday) at 09:00. Please call 0900 0900 90 at that time."
    );
    assert!(to_doctor[0].text.contains("DOB: 1980-02-14"));
    assert!(to_doctor[0].text.contains(&format!("User ID: {}", PATIENT_ID)));
}

#[tokio::test]
async fn test_scenario_c_second_patient_cannot_claim_pending_slot() {
    let h = Harness::new().await;
    h.book(PATIENT_ID).await.unwrap();

    assert_matches!(h.book(SECOND_PATIENT_ID).await, Err(BookingError::SlotTaken(_)));

    let for_slot: Vec<_> = h
        .ledger
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.slot_key() == h.fixtures.martin_nine())
        .collect();
    assert_eq!(for_slot.len(), 1);
    assert_eq!(for_slot[0].user_id, PATIENT_ID);
}

#[tokio::test]
async fn test_scenario_d_rejection_asks_patient_to_reselect() {
    let h = Harness::new().await;
    let booking = h.book(PATIENT_ID).await.unwrap();

    let report = h.workflow.decide(booking.id, Decision::Reject).await.unwrap();

    assert_eq!(report.booking.status, BookingStatus::Rejected);
    assert!(!report.booking.confirmed);
    assert!(report.doctor_outcome.is_none());
    assert!(h.slot_flag().await);

    let to_patient = h.messenger.sent_to(PATIENT_ID);
    assert_eq!(to_patient.len(), 1);
    assert!(to_patient[0].text.contains("Please select another slot."));
    assert!(h.messenger.sent_to(DOCTOR_MARTIN).is_empty());
}

#[tokio::test]
async fn test_scenario_e_admin_cancellation_is_final() {
    let h = Harness::new().await;
    let booking = h.book(PATIENT_ID).await.unwrap();
    h.workflow.decide(booking.id, Decision::Approve).await.unwrap();
    h.messenger.clear();

    let report = h.workflow.cancel(booking.id, CancelledBy::Admin).await.unwrap();

    assert_eq!(report.booking.status, BookingStatus::Cancelled);
    assert!(h.slot_flag().await);
    assert!(report.doctor_outcome.is_delivered());
    assert_eq!(h.messenger.sent_to(PATIENT_ID).len(), 1);
    assert_matches!(
        h.workflow.cancel(booking.id, CancelledBy::Admin).await,
        Err(BookingError::AlreadyCancelled)
    );
}

#[tokio::test]
async fn test_double_tap_approval_is_idempotent() {
    let h = Harness::new().await;
    let booking = h.book(PATIENT_ID).await.unwrap();

    h.workflow.decide(booking.id, Decision::Approve).await.unwrap();
    let sent_after_first = h.messenger.sent().len();

    assert_matches!(
        h.workflow.decide(booking.id, Decision::Approve).await,
        Err(BookingError::AlreadyDecided { status: BookingStatus::Approved })
    );
    assert_eq!(h.messenger.sent().len(), sent_after_first);
}

#[tokio::test]
async fn test_unknown_booking_decision() {
    let h = Harness::new().await;
    assert_matches!(
        h.workflow.decide(404, Decision::Reject).await,
        Err(BookingError::NotFound(404))
    );
}

#[tokio::test]
async fn test_undeliverable_doctor_request_escalates_to_admins() {
    let h = Harness::new().await;
    h.messenger
        .fail_for(DOCTOR_MARTIN, DeliveryFailure::Unreachable("chat not found".into()));
    let booking = h.book(PATIENT_ID).await.unwrap();

    let report = h
        .workflow
        .request_approval(&booking, Some("anna_k"), decision_row(&booking))
        .await;

    assert!(!report.doctor_outcome.is_delivered());
    assert!(report.escalated);
    let to_admin = h.messenger.sent_to(ADMIN_ID);
    assert_eq!(to_admin.len(), 1);
    assert!(to_admin[0].text.contains(&format!("booking ID {}", booking.id)));

    let stored = h.ledger.get_by_id(booking.id).await.unwrap();
    assert_eq!(stored.status, BookingStatus::Pending);
}

#[tokio::test]
async fn test_approval_request_carries_decision_actions() {
    let h = Harness::new().await;
    let booking = h.book(PATIENT_ID).await.unwrap();

    let report = h.workflow.request_approval(&booking, None, decision_row(&booking)).await;

    assert!(report.doctor_outcome.is_delivered());
    let to_doctor = h.messenger.sent_to(DOCTOR_MARTIN);
    assert!(to_doctor[0].text.contains("Username: N/A"));
    let data: Vec<String> = to_doctor[0].action_data().map(str::to_string).collect();
    assert_eq!(
        data,
        vec![
            format!("approve_booking_{}", booking.id),
            format!("reject_booking_{}", booking.id),
        ]
    );
}

#[tokio::test]
async fn test_blocked_patient_does_not_roll_back_approval() {
    let h = Harness::new().await;
    h.messenger.fail_for(PATIENT_ID, DeliveryFailure::Blocked);
    let booking = h.book(PATIENT_ID).await.unwrap();

    let report = h.workflow.decide(booking.id, Decision::Approve).await.unwrap();

    assert!(!report.patient_outcome.is_delivered());
    assert!(!report.escalated);
    assert_eq!(
        h.ledger.get_by_id(booking.id).await.unwrap().status,
        BookingStatus::Approved
    );
}
