use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::{AppConfig, StorageBackend};
use shared_database::{AdminRemoval, BookingStore, StoreError, SupabaseClient, SupabaseStore};
use shared_models::{BookingStatus, BookingTransition, NewBooking, SlotEffect, SlotKey};

fn store_for(mock_server: &MockServer) -> SupabaseStore {
    let config = AppConfig {
        storage_backend: StorageBackend::Supabase,
        supabase_url: mock_server.uri(),
        supabase_service_key: "test-service-key".to_string(),
        ..AppConfig::default()
    };
    SupabaseStore::new(Arc::new(SupabaseClient::new(&config)))
}

fn booking_json(status: &str, confirmed: bool) -> serde_json::Value {
    json!({
        "id": 7,
        "user_id": 1001,
        "patient_name": "Anna Keller",
        "patient_dob": "1980-02-14",
        "time_slot": "09:00",
        "booking_date": "2025-04-23",
        "doctor_id": 42,
        "status": status,
        "confirmed": confirmed
    })
}

fn new_booking() -> NewBooking {
    NewBooking {
        user_id: 1001,
        patient_name: "Anna Keller".to_string(),
        patient_dob: NaiveDate::from_ymd_opt(1980, 2, 14).unwrap(),
        slot: SlotKey::new(42, NaiveDate::from_ymd_opt(2025, 4, 23).unwrap(), "09:00"),
    }
}

#[tokio::test]
async fn test_reserve_slot_calls_rpc() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/reserve_slot"))
        .and(header("apikey", "test-service-key"))
        .and(header("Authorization", "Bearer test-service-key"))
        .and(body_partial_json(json!({ "p_doctor_id": 42, "p_time_slot": "09:00" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "outcome": "reserved",
            "booking": booking_json("pending", false)
        })))
        .mount(&mock_server)
        .await;

    let booking = store_for(&mock_server).reserve_slot(&new_booking()).await.unwrap();

    assert_eq!(booking.id, 7);
    assert_eq!(booking.status, BookingStatus::Pending);
    assert!(!booking.confirmed);
}

#[tokio::test]
async fn test_reserve_slot_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/reserve_slot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "outcome": "unavailable",
            "booking": null
        })))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server).reserve_slot(&new_booking()).await;
    assert_matches!(result, Err(StoreError::SlotUnavailable));
}

#[tokio::test]
async fn test_transition_status_mismatch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/transition_booking"))
        .and(body_partial_json(json!({ "p_from": "pending", "p_to": "approved", "p_slot_effect": "hold" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "outcome": "status_mismatch",
            "booking": null,
            "current_status": "rejected"
        })))
        .mount(&mock_server)
        .await;

    let transition = BookingTransition {
        booking_id: 7,
        from: BookingStatus::Pending,
        to: BookingStatus::Approved,
        confirmed: true,
        slot_effect: SlotEffect::Hold,
    };
    let result = store_for(&mock_server).apply_transition(&transition).await;
    assert_matches!(result, Err(StoreError::StatusMismatch { current: BookingStatus::Rejected }));
}

#[tokio::test]
async fn test_list_doctors_and_lookup() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("user_id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "user_id": 42, "name": "Dr. Martin" }
        ])))
        .mount(&mock_server)
        .await;

    let doctor = store_for(&mock_server).get_doctor(42).await.unwrap().unwrap();
    assert_eq!(doctor.name, "Dr. Martin");
}

#[tokio::test]
async fn test_backend_failure_maps_to_backend_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is down"))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server).get_booking(7).await;
    assert_matches!(result, Err(StoreError::Backend(msg)) if msg.contains("database is down"));
}

#[tokio::test]
async fn test_remove_admin_uses_rpc_outcome() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/remove_admin"))
        .and(body_partial_json(json!({ "p_user_id": 9000 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "outcome": "last_admin" })))
        .mount(&mock_server)
        .await;

    let outcome = store_for(&mock_server).remove_admin(9000).await.unwrap();
    assert_eq!(outcome, AdminRemoval::LastAdmin);
}
