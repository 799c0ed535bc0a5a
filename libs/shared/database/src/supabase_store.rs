use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_models::{
    AdminRecord, Booking, BookingFilter, BookingId, BookingStatus, BookingTransition, Doctor,
    NewBooking, Slot, SlotEffect, SlotKey, SlotQuery, SupportRequest, SystemStats, UserId,
    UserProfile,
};

use crate::repository::{AdminRemoval, BookingStore, StoreError, StoreResult};
use crate::supabase::SupabaseClient;

const RETURN_REPRESENTATION: (&str, &str) = ("prefer", "return=representation");
const IGNORE_DUPLICATES: (&str, &str) = ("prefer", "resolution=ignore-duplicates,return=representation");
const MERGE_DUPLICATES: (&str, &str) = ("prefer", "resolution=merge-duplicates,return=representation");

#[derive(Debug, Deserialize)]
struct ReservationResponse {
    outcome: String,
    booking: Option<Booking>,
}

#[derive(Debug, Deserialize)]
struct OutcomeResponse {
    outcome: String,
}

#[derive(Debug, Deserialize)]
struct TransitionResponse {
    outcome: String,
    booking: Option<Booking>,
    current_status: Option<BookingStatus>,
}

/// PostgREST-backed store. The atomic operations are Postgres functions
/// defined in `migrations/001_booking_schema.sql`.
pub struct SupabaseStore {
    client: Arc<SupabaseClient>,
}

impl SupabaseStore {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }

    fn slot_filter(key: &SlotKey) -> String {
        format!(
            "doctor_id=eq.{}&booking_date=eq.{}&time_slot=eq.{}",
            key.doctor_id, key.booking_date, key.time_slot
        )
    }

    fn booking_query(filter: &BookingFilter) -> String {
        let mut path = String::from("/rest/v1/bookings?select=*&order=id.asc");
        if let Some(user_id) = filter.user_id {
            path.push_str(&format!("&user_id=eq.{}", user_id));
        }
        if let Some(doctor_id) = filter.doctor_id {
            path.push_str(&format!("&doctor_id=eq.{}", doctor_id));
        }
        if filter.confirmed_only {
            path.push_str("&confirmed=is.true");
        }
        if let Some(statuses) = &filter.statuses {
            let list: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
            path.push_str(&format!("&status=in.({})", list.join(",")));
        }
        path
    }

    fn slot_effect_name(effect: SlotEffect) -> &'static str {
        match effect {
            SlotEffect::None => "none",
            SlotEffect::Hold => "hold",
            SlotEffect::Release => "release",
        }
    }
}

#[async_trait]
impl BookingStore for SupabaseStore {
    async fn ping(&self) -> StoreResult<()> {
        let _: Vec<Value> = self
            .client
            .request(Method::GET, "/rest/v1/doctors?select=user_id&limit=1", None)
            .await?;
        Ok(())
    }

    async fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
        Ok(self
            .client
            .request(Method::GET, "/rest/v1/doctors?select=user_id,name&order=name.asc", None)
            .await?)
    }

    async fn get_doctor(&self, doctor_id: UserId) -> StoreResult<Option<Doctor>> {
        let path = format!("/rest/v1/doctors?user_id=eq.{}&select=user_id,name", doctor_id);
        let doctors: Vec<Doctor> = self.client.request(Method::GET, &path, None).await?;
        Ok(doctors.into_iter().next())
    }

    async fn insert_doctor(&self, doctor: &Doctor) -> StoreResult<bool> {
        let inserted: Vec<Doctor> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctors?on_conflict=user_id",
                Some(json!({ "user_id": doctor.user_id, "name": doctor.name })),
                &[IGNORE_DUPLICATES],
            )
            .await?;
        Ok(!inserted.is_empty())
    }

    async fn list_admins(&self) -> StoreResult<Vec<UserId>> {
        let admins: Vec<AdminRecord> = self
            .client
            .request(Method::GET, "/rest/v1/admins?select=user_id&order=user_id.asc", None)
            .await?;
        Ok(admins.into_iter().map(|a| a.user_id).collect())
    }

    async fn is_admin(&self, user_id: UserId) -> StoreResult<bool> {
        let path = format!("/rest/v1/admins?user_id=eq.{}&select=user_id", user_id);
        let admins: Vec<AdminRecord> = self.client.request(Method::GET, &path, None).await?;
        Ok(!admins.is_empty())
    }

    async fn insert_admin(&self, user_id: UserId) -> StoreResult<bool> {
        let inserted: Vec<AdminRecord> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/admins?on_conflict=user_id",
                Some(json!({ "user_id": user_id })),
                &[IGNORE_DUPLICATES],
            )
            .await?;
        Ok(!inserted.is_empty())
    }

    async fn remove_admin(&self, user_id: UserId) -> StoreResult<AdminRemoval> {
        let response: OutcomeResponse = self
            .client
            .request(
                Method::POST,
                "/rest/v1/rpc/remove_admin",
                Some(json!({ "p_user_id": user_id })),
            )
            .await?;

        match response.outcome.as_str() {
            "removed" => Ok(AdminRemoval::Removed),
            "not_admin" => Ok(AdminRemoval::NotAnAdmin),
            "last_admin" => Ok(AdminRemoval::LastAdmin),
            outcome => {
                warn!("Unexpected remove_admin outcome: {}", outcome);
                Err(StoreError::Backend(format!("Unexpected remove_admin outcome: {}", outcome)))
            }
        }
    }

    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<UserProfile>> {
        let path = format!("/rest/v1/users?user_id=eq.{}&select=*", user_id);
        let profiles: Vec<UserProfile> = self.client.request(Method::GET, &path, None).await?;
        Ok(profiles.into_iter().next())
    }

    async fn list_profiles(&self) -> StoreResult<Vec<UserProfile>> {
        Ok(self
            .client
            .request(Method::GET, "/rest/v1/users?select=*&order=user_id.asc", None)
            .await?)
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> StoreResult<UserProfile> {
        let body = serde_json::to_value(profile)
            .map_err(|e| StoreError::Backend(format!("Failed to encode profile: {}", e)))?;
        let saved: Vec<UserProfile> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/users?on_conflict=user_id",
                Some(body),
                &[MERGE_DUPLICATES],
            )
            .await?;
        saved
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Profile upsert returned no rows".to_string()))
    }

    async fn delete_profile(&self, user_id: UserId) -> StoreResult<bool> {
        let path = format!("/rest/v1/users?user_id=eq.{}", user_id);
        let deleted: Vec<UserProfile> = self
            .client
            .request_with_headers(Method::DELETE, &path, None, &[RETURN_REPRESENTATION])
            .await?;
        Ok(!deleted.is_empty())
    }

    async fn get_slot(&self, key: &SlotKey) -> StoreResult<Option<Slot>> {
        let path = format!("/rest/v1/doctor_slots?{}&select=*", Self::slot_filter(key));
        let slots: Vec<Slot> = self.client.request(Method::GET, &path, None).await?;
        Ok(slots.into_iter().next())
    }

    async fn insert_slot(&self, key: &SlotKey) -> StoreResult<Slot> {
        let inserted: Vec<Slot> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_slots?on_conflict=booking_date,time_slot,doctor_id",
                Some(json!({
                    "booking_date": key.booking_date,
                    "time_slot": key.time_slot,
                    "doctor_id": key.doctor_id,
                    "is_available": true,
                })),
                &[IGNORE_DUPLICATES],
            )
            .await?;

        match inserted.into_iter().next() {
            Some(slot) => Ok(slot),
            None => {
                debug!("Slot {} already published", key);
                self.get_slot(key)
                    .await?
                    .ok_or_else(|| StoreError::SlotNotFound(key.clone()))
            }
        }
    }

    async fn list_slots(&self, query: &SlotQuery) -> StoreResult<Vec<Slot>> {
        let mut path = format!(
            "/rest/v1/doctor_slots?select=*&booking_date=gte.{}&booking_date=lte.{}&order=booking_date.asc,time_slot.asc,doctor_id.asc",
            query.from, query.to
        );
        if let Some(doctor_id) = query.doctor_id {
            path.push_str(&format!("&doctor_id=eq.{}", doctor_id));
        }
        if query.available_only {
            path.push_str("&is_available=is.true");
        }
        Ok(self.client.request(Method::GET, &path, None).await?)
    }

    async fn set_slot_availability(&self, key: &SlotKey, available: bool) -> StoreResult<Slot> {
        let path = format!("/rest/v1/doctor_slots?{}", Self::slot_filter(key));
        let updated: Vec<Slot> = self
            .client
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(json!({ "is_available": available })),
                &[RETURN_REPRESENTATION],
            )
            .await?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::SlotNotFound(key.clone()))
    }

    async fn reserve_slot(&self, request: &NewBooking) -> StoreResult<Booking> {
        let response: ReservationResponse = self
            .client
            .request(
                Method::POST,
                "/rest/v1/rpc/reserve_slot",
                Some(json!({
                    "p_user_id": request.user_id,
                    "p_patient_name": request.patient_name,
                    "p_patient_dob": request.patient_dob,
                    "p_doctor_id": request.slot.doctor_id,
                    "p_booking_date": request.slot.booking_date,
                    "p_time_slot": request.slot.time_slot,
                })),
            )
            .await?;

        match (response.outcome.as_str(), response.booking) {
            ("reserved", Some(booking)) => Ok(booking),
            ("unavailable", _) => Err(StoreError::SlotUnavailable),
            (outcome, _) => {
                warn!("Unexpected reserve_slot outcome: {}", outcome);
                Err(StoreError::Backend(format!("Unexpected reserve_slot outcome: {}", outcome)))
            }
        }
    }

    async fn apply_transition(&self, transition: &BookingTransition) -> StoreResult<Booking> {
        let response: TransitionResponse = self
            .client
            .request(
                Method::POST,
                "/rest/v1/rpc/transition_booking",
                Some(json!({
                    "p_booking_id": transition.booking_id,
                    "p_from": transition.from.as_str(),
                    "p_to": transition.to.as_str(),
                    "p_confirmed": transition.confirmed,
                    "p_slot_effect": Self::slot_effect_name(transition.slot_effect),
                })),
            )
            .await?;

        match (response.outcome.as_str(), response.booking, response.current_status) {
            ("applied", Some(booking), _) => Ok(booking),
            ("not_found", _, _) => Err(StoreError::BookingNotFound(transition.booking_id)),
            ("status_mismatch", _, Some(current)) => Err(StoreError::StatusMismatch { current }),
            ("slot_not_found", Some(booking), _) => Err(StoreError::SlotNotFound(booking.slot_key())),
            (outcome, _, _) => {
                warn!("Unexpected transition_booking outcome: {}", outcome);
                Err(StoreError::Backend(format!(
                    "Unexpected transition_booking outcome: {}",
                    outcome
                )))
            }
        }
    }

    async fn get_booking(&self, booking_id: BookingId) -> StoreResult<Option<Booking>> {
        let path = format!("/rest/v1/bookings?id=eq.{}&select=*", booking_id);
        let bookings: Vec<Booking> = self.client.request(Method::GET, &path, None).await?;
        Ok(bookings.into_iter().next())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        Ok(self
            .client
            .request(Method::GET, &Self::booking_query(filter), None)
            .await?)
    }

    async fn insert_support_request(
        &self,
        user_id: UserId,
        message: &str,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<SupportRequest> {
        let inserted: Vec<SupportRequest> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/support_requests",
                Some(json!({
                    "user_id": user_id,
                    "message": message,
                    "timestamp": timestamp,
                    "status": "open",
                })),
                &[RETURN_REPRESENTATION],
            )
            .await?;
        inserted
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Support request insert returned no rows".to_string()))
    }

    async fn stats(&self) -> StoreResult<SystemStats> {
        Ok(self
            .client
            .request(Method::POST, "/rest/v1/rpc/system_stats", Some(json!({})))
            .await?)
    }
}
