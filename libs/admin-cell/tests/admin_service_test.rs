use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;

use admin_cell::{AdminError, AdminService, SupportService};
use appointment_cell::{ApprovalWorkflow, BookingLedger};
use doctor_cell::{AvailabilityError, AvailabilityService, DoctorService};
use notification_cell::NotificationDispatcher;
use shared_database::BookingStore;
use shared_models::{BookingStatus, Language, NewBooking, SlotKey, UserProfile};
use shared_utils::test_utils::{
    slot_key, RecordingMessenger, TestConfig, TestFixtures, ADMIN_ID, DOCTOR_MARTIN, PATIENT_ID,
};

struct Harness {
    fixtures: TestFixtures,
    messenger: Arc<RecordingMessenger>,
    ledger: Arc<BookingLedger>,
    admin: AdminService,
    support: SupportService,
}

impl Harness {
    async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    async fn with_config(config: TestConfig) -> Self {
        let fixtures = TestFixtures::with_config(config).await;
        let messenger = Arc::new(RecordingMessenger::new());
        let store = fixtures.dyn_store();
        let ledger = Arc::new(BookingLedger::new(store.clone()));
        let doctors = Arc::new(DoctorService::new(store.clone()));
        let notifications = Arc::new(NotificationDispatcher::new(
            messenger.clone(),
            store.clone(),
            &fixtures.config,
        ));
        let workflow = Arc::new(ApprovalWorkflow::new(
            ledger.clone(),
            doctors.clone(),
            notifications.clone(),
            fixtures.config.clone(),
            fixtures.clock.clone(),
        ));
        let availability = Arc::new(AvailabilityService::new(
            store.clone(),
            fixtures.config.clone(),
            fixtures.clock.clone(),
        ));
        let admin = AdminService::new(store.clone(), ledger.clone(), workflow, doctors, availability);
        let support = SupportService::new(store, notifications);

        Self {
            fixtures,
            messenger,
            ledger,
            admin,
            support,
        }
    }

    async fn book(&self, slot: SlotKey) -> shared_models::Booking {
        self.ledger
            .create_pending(NewBooking {
                user_id: PATIENT_ID,
                patient_name: "Anna Keller".to_string(),
                patient_dob: NaiveDate::from_ymd_opt(1980, 2, 14).unwrap(),
                slot,
            })
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn cannot_remove_the_last_admin() {
    let harness = Harness::new().await;

    assert_matches!(harness.admin.remove_admin(ADMIN_ID).await, Err(AdminError::LastAdmin));
    assert_matches!(harness.admin.remove_admin(12345).await, Err(AdminError::NotAnAdmin(12345)));

    assert!(harness.admin.add_admin(12345).await.unwrap());
    assert!(!harness.admin.add_admin(12345).await.unwrap());
    harness.admin.remove_admin(ADMIN_ID).await.unwrap();

    assert_eq!(harness.admin.list_admins().await.unwrap(), vec![12345]);
    assert!(!harness.admin.is_admin(ADMIN_ID).await.unwrap());
}

#[tokio::test]
async fn admins_removing_each_other_leave_one_behind() {
    let harness = Harness::new().await;
    harness.admin.add_admin(12345).await.unwrap();

    let (first, second) = tokio::join!(
        harness.admin.remove_admin(ADMIN_ID),
        harness.admin.remove_admin(12345)
    );

    assert_eq!([&first, &second].iter().filter(|r| r.is_ok()).count(), 1);
    assert!(matches!(first, Err(AdminError::LastAdmin)) || matches!(second, Err(AdminError::LastAdmin)));
    assert_eq!(harness.admin.list_admins().await.unwrap().len(), 1);
}

#[tokio::test]
async fn seeding_admins_is_idempotent() {
    let harness = Harness::with_config(TestConfig {
        admin_ids: vec![],
        ..TestConfig::default()
    })
    .await;

    assert_eq!(harness.admin.seed_admins(&[ADMIN_ID, 7]).await.unwrap(), 2);
    assert_eq!(harness.admin.seed_admins(&[ADMIN_ID, 7]).await.unwrap(), 0);
    assert_eq!(harness.admin.list_admins().await.unwrap().len(), 2);
}

#[tokio::test]
async fn edit_user_updates_caregiver_fields() {
    let harness = Harness::new().await;
    assert_matches!(
        harness.admin.edit_user(PATIENT_ID, "1,John Doe").await,
        Err(AdminError::UserNotFound(PATIENT_ID))
    );

    harness
        .fixtures
        .store
        .upsert_profile(&UserProfile::for_self(PATIENT_ID, Language::De))
        .await
        .unwrap();

    let updated = harness.admin.edit_user(PATIENT_ID, "1,John Doe").await.unwrap();
    assert!(updated.is_caregiver);
    assert_eq!(updated.linked_patient.as_deref(), Some("John Doe"));
    assert_eq!(updated.language, Language::De);

    assert_matches!(
        harness.admin.edit_user(PATIENT_ID, "sure").await,
        Err(AdminError::InvalidPayload(_))
    );
    let unchanged = harness.admin.get_user(PATIENT_ID).await.unwrap();
    assert!(unchanged.is_caregiver);
}

#[tokio::test]
async fn deleting_a_user_settles_their_bookings() {
    let harness = Harness::new().await;
    harness
        .fixtures
        .store
        .upsert_profile(&UserProfile::for_self(PATIENT_ID, Language::En))
        .await
        .unwrap();

    let approved = harness.book(harness.fixtures.martin_nine()).await;
    harness.ledger.approve(approved.id).await.unwrap();
    let pending = harness.book(slot_key(DOCTOR_MARTIN, "2025-04-23", "10:00")).await;

    let deletion = harness.admin.delete_user(PATIENT_ID).await.unwrap();
    assert!(deletion.profile_deleted);
    assert_eq!(deletion.cancelled, vec![approved.id]);
    assert_eq!(deletion.rejected, vec![pending.id]);

    assert_eq!(
        harness.ledger.get_by_id(approved.id).await.unwrap().status,
        BookingStatus::Cancelled
    );
    assert_eq!(
        harness.ledger.get_by_id(pending.id).await.unwrap().status,
        BookingStatus::Rejected
    );
    let slot = harness
        .fixtures
        .store
        .get_slot(&harness.fixtures.martin_nine())
        .await
        .unwrap()
        .unwrap();
    assert!(slot.is_available);

    // The doctor hears about the cancelled appointment.
    assert!(harness
        .messenger
        .sent_to(DOCTOR_MARTIN)
        .iter()
        .any(|m| m.text.starts_with("🔔 Booking cancelled")));
    assert_matches!(harness.admin.get_user(PATIENT_ID).await, Err(AdminError::UserNotFound(_)));
}

#[tokio::test]
async fn add_slot_validates_payload() {
    let harness = Harness::new().await;

    let slot = harness.admin.add_slot("2025-04-24,11:00,42").await.unwrap();
    assert!(slot.is_available);
    assert_eq!(slot.time_slot, "11:00");

    assert_matches!(
        harness.admin.add_slot("2025-04-24,11:00").await,
        Err(AdminError::InvalidPayload(_))
    );
    assert_matches!(
        harness.admin.add_slot("24.04.2025,11:00,42").await,
        Err(AdminError::Availability(AvailabilityError::InvalidDate(_)))
    );
    assert_matches!(
        harness.admin.add_slot("2025-04-24,11:30,42").await,
        Err(AdminError::Availability(AvailabilityError::InvalidTimeOfDay(_)))
    );
    assert_matches!(
        harness.admin.add_slot("2025-04-24,11:00,77").await,
        Err(AdminError::Availability(AvailabilityError::UnknownDoctor(77)))
    );

    let listings = harness.admin.list_available_slots().await.unwrap();
    assert_eq!(listings.len(), 3);
}

#[tokio::test]
async fn add_doctor_reports_new_registrations() {
    let harness = Harness::new().await;

    let (doctor, inserted) = harness.admin.add_doctor("987654321, Dr. Huber").await.unwrap();
    assert!(inserted);
    assert_eq!(doctor.name, "Dr. Huber");

    let (_, inserted) = harness.admin.add_doctor("987654321,Dr. Huber").await.unwrap();
    assert!(!inserted);
    assert_eq!(harness.admin.list_doctors().await.unwrap().len(), 3);
}

#[tokio::test]
async fn stats_and_health() {
    let harness = Harness::new().await;
    let booking = harness.book(harness.fixtures.martin_nine()).await;
    harness.ledger.approve(booking.id).await.unwrap();

    let stats = harness.admin.system_stats().await.unwrap();
    assert_eq!(stats.total_bookings, 1);
    assert_eq!(stats.total_admins, 1);
    assert_eq!(stats.total_doctors, 2);

    let health = harness.admin.health().await;
    assert!(health.storage_ok);
    assert_eq!(health.stats, Some(stats));

    harness.fixtures.store.set_offline(true);
    let health = harness.admin.health().await;
    assert!(!health.storage_ok);
    assert!(health.detail.is_some());
}

#[tokio::test]
async fn support_requests_reach_admins() {
    let harness = Harness::new().await;

    let receipt = harness
        .support
        .submit(PATIENT_ID, Some("anna"), "  I cannot find my booking  ")
        .await
        .unwrap();
    assert_eq!(receipt.request.message, "I cannot find my booking");
    assert_eq!(receipt.admins_notified.success, 1);

    let to_admin = harness.messenger.sent_to(ADMIN_ID);
    assert_eq!(to_admin.len(), 1);
    assert!(to_admin[0].text.contains("Username: anna"));
    assert!(to_admin[0].text.ends_with("I cannot find my booking"));

    assert_matches!(
        harness.support.submit(PATIENT_ID, None, "   ").await,
        Err(AdminError::InvalidPayload(_))
    );
}
