use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use futures::future::join_all;

use appointment_cell::{BookingError, BookingLedger};
use shared_database::BookingStore;
use shared_models::{BookingStatus, NewBooking, SlotKey};
use shared_utils::test_utils::{TestFixtures, PATIENT_ID, SECOND_PATIENT_ID};

fn request(user_id: i64, slot: &SlotKey) -> NewBooking {
    NewBooking {
        user_id,
        patient_name: "Anna Keller".to_string(),
        patient_dob: NaiveDate::from_ymd_opt(1980, 2, 14).unwrap(),
        slot: slot.clone(),
    }
}

async fn slot_available(fixtures: &TestFixtures, key: &SlotKey) -> bool {
    fixtures.store.get_slot(key).await.unwrap().unwrap().is_available
}

#[tokio::test]
async fn test_concurrent_creates_leave_one_active_booking() {
    let fixtures = TestFixtures::new().await;
    let ledger = Arc::new(BookingLedger::new(fixtures.dyn_store()));
    let key = fixtures.martin_nine();

    let attempts = (0..20).map(|n| {
        let ledger = ledger.clone();
        let key = key.clone();
        tokio::spawn(async move { ledger.create_pending(request(2000 + n, &key)).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for failed in results.iter().filter(|r| r.is_err()) {
        assert_matches!(failed, Err(BookingError::SlotTaken(k)) if *k == key);
    }

    let active: Vec<_> = ledger
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.status.is_active() && b.slot_key() == key)
        .collect();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn test_rejected_slot_can_be_booked_again() {
    let fixtures = TestFixtures::new().await;
    let ledger = BookingLedger::new(fixtures.dyn_store());
    let key = fixtures.martin_nine();

    let first = ledger.create_pending(request(PATIENT_ID, &key)).await.unwrap();
    ledger.reject(first.id).await.unwrap();

    let second = ledger.create_pending(request(SECOND_PATIENT_ID, &key)).await.unwrap();
    assert_eq!(second.status, BookingStatus::Pending);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn test_second_decision_fails_and_changes_nothing() {
    let fixtures = TestFixtures::new().await;
    let ledger = BookingLedger::new(fixtures.dyn_store());
    let booking = ledger
        .create_pending(request(PATIENT_ID, &fixtures.martin_nine()))
        .await
        .unwrap();

    let approved = ledger.approve(booking.id).await.unwrap();
    assert_matches!(
        ledger.approve(booking.id).await,
        Err(BookingError::AlreadyDecided { status: BookingStatus::Approved })
    );
    assert_matches!(
        ledger.reject(booking.id).await,
        Err(BookingError::AlreadyDecided { status: BookingStatus::Approved })
    );
    assert_eq!(ledger.get_by_id(booking.id).await.unwrap(), approved);

    let other = ledger
        .create_pending(request(
            SECOND_PATIENT_ID,
            &shared_utils::test_utils::slot_key(42, "2025-04-23", "10:00"),
        ))
        .await
        .unwrap();
    let rejected = ledger.reject(other.id).await.unwrap();
    assert_matches!(
        ledger.reject(other.id).await,
        Err(BookingError::AlreadyDecided { status: BookingStatus::Rejected })
    );
    assert_matches!(
        ledger.approve(other.id).await,
        Err(BookingError::AlreadyDecided { status: BookingStatus::Rejected })
    );
    assert_eq!(ledger.get_by_id(other.id).await.unwrap(), rejected);
}

#[tokio::test]
async fn test_cancellation_is_not_repeatable() {
    let fixtures = TestFixtures::new().await;
    let ledger = BookingLedger::new(fixtures.dyn_store());
    let booking = ledger
        .create_pending(request(PATIENT_ID, &fixtures.martin_nine()))
        .await
        .unwrap();
    ledger.approve(booking.id).await.unwrap();

    let cancelled = ledger.cancel(booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(!cancelled.confirmed);

    assert_matches!(ledger.cancel(booking.id).await, Err(BookingError::AlreadyCancelled));
    assert_eq!(ledger.get_by_id(booking.id).await.unwrap(), cancelled);
}

#[tokio::test]
async fn test_cancel_requires_approved_booking() {
    let fixtures = TestFixtures::new().await;
    let ledger = BookingLedger::new(fixtures.dyn_store());
    let booking = ledger
        .create_pending(request(PATIENT_ID, &fixtures.martin_nine()))
        .await
        .unwrap();

    assert_matches!(
        ledger.cancel(booking.id).await,
        Err(BookingError::InvalidStatusTransition {
            from: BookingStatus::Pending,
            to: BookingStatus::Cancelled
        })
    );

    ledger.reject(booking.id).await.unwrap();
    assert_matches!(
        ledger.cancel(booking.id).await,
        Err(BookingError::InvalidStatusTransition { from: BookingStatus::Rejected, .. })
    );
    assert_matches!(ledger.cancel(9999).await, Err(BookingError::NotFound(9999)));
}

#[tokio::test]
async fn test_approve_then_cancel_restores_slot() {
    let fixtures = TestFixtures::new().await;
    let ledger = BookingLedger::new(fixtures.dyn_store());
    let key = fixtures.martin_nine();
    let before = fixtures.store.get_slot(&key).await.unwrap().unwrap();

    let booking = ledger.create_pending(request(PATIENT_ID, &key)).await.unwrap();
    assert!(slot_available(&fixtures, &key).await);

    ledger.approve(booking.id).await.unwrap();
    assert!(!slot_available(&fixtures, &key).await);

    ledger.cancel(booking.id).await.unwrap();
    assert_eq!(fixtures.store.get_slot(&key).await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn test_user_listing_shows_confirmed_only() {
    let fixtures = TestFixtures::new().await;
    let ledger = BookingLedger::new(fixtures.dyn_store());
    let nine = fixtures.martin_nine();
    let ten = shared_utils::test_utils::slot_key(42, "2025-04-23", "10:00");

    let approved = ledger.create_pending(request(PATIENT_ID, &nine)).await.unwrap();
    ledger.approve(approved.id).await.unwrap();
    ledger.create_pending(request(PATIENT_ID, &ten)).await.unwrap();

    let mine = ledger.list_for_user(PATIENT_ID).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, approved.id);
    assert_eq!(ledger.list_active_for_user(PATIENT_ID).await.unwrap().len(), 2);
    assert_eq!(ledger.list_confirmed().await.unwrap().len(), 1);
    assert!(ledger.list_for_user(SECOND_PATIENT_ID).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_patient_name_is_rejected() {
    let fixtures = TestFixtures::new().await;
    let ledger = BookingLedger::new(fixtures.dyn_store());
    let mut blank = request(PATIENT_ID, &fixtures.martin_nine());
    blank.patient_name = "   ".to_string();

    assert_matches!(ledger.create_pending(blank).await, Err(BookingError::Validation(_)));
}
