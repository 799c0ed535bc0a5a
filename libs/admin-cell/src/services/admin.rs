use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use appointment_cell::{ApprovalWorkflow, BookingError, BookingLedger, CancellationReport, CancelledBy};
use doctor_cell::{AvailabilityService, DoctorService};
use shared_database::{AdminRemoval, BookingStore};
use shared_models::{
    Booking, BookingId, BookingStatus, Doctor, Slot, SlotListing, SystemStats, UserId, UserProfile,
};

use crate::models::{
    AdminError, DoctorPayload, HealthReport, SlotPayload, UserDeletion, UserEditPayload,
};

/// Privileged operations. Callers check `is_admin` before invoking these.
pub struct AdminService {
    store: Arc<dyn BookingStore>,
    ledger: Arc<BookingLedger>,
    workflow: Arc<ApprovalWorkflow>,
    doctors: Arc<DoctorService>,
    availability: Arc<AvailabilityService>,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        ledger: Arc<BookingLedger>,
        workflow: Arc<ApprovalWorkflow>,
        doctors: Arc<DoctorService>,
        availability: Arc<AvailabilityService>,
    ) -> Self {
        Self {
            store,
            ledger,
            workflow,
            doctors,
            availability,
        }
    }

    pub async fn is_admin(&self, user_id: UserId) -> Result<bool, AdminError> {
        Ok(self.store.is_admin(user_id).await?)
    }

    pub async fn list_admins(&self) -> Result<Vec<UserId>, AdminError> {
        Ok(self.store.list_admins().await?)
    }

    /// Idempotent. Returns false when the user already was an administrator.
    pub async fn add_admin(&self, user_id: UserId) -> Result<bool, AdminError> {
        let added = self.store.insert_admin(user_id).await?;
        if added {
            info!("Added administrator {}", user_id);
        }
        Ok(added)
    }

    pub async fn remove_admin(&self, user_id: UserId) -> Result<(), AdminError> {
        match self.store.remove_admin(user_id).await? {
            AdminRemoval::Removed => {
                info!("Removed administrator {}", user_id);
                Ok(())
            }
            AdminRemoval::NotAnAdmin => Err(AdminError::NotAnAdmin(user_id)),
            AdminRemoval::LastAdmin => Err(AdminError::LastAdmin),
        }
    }

    /// Registers the configured ids at start-up.
    pub async fn seed_admins(&self, admin_ids: &[UserId]) -> Result<usize, AdminError> {
        let mut inserted = 0;
        for admin_id in admin_ids {
            if self.store.insert_admin(*admin_id).await? {
                inserted += 1;
            }
        }
        if admin_ids.is_empty() {
            warn!("No ADMIN_IDS configured; administrator features need a registered admin");
        }
        Ok(inserted)
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, AdminError> {
        Ok(self.store.list_profiles().await?)
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<UserProfile, AdminError> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or(AdminError::UserNotFound(user_id))
    }

    pub async fn edit_user(&self, user_id: UserId, payload: &str) -> Result<UserProfile, AdminError> {
        let edit: UserEditPayload = payload.parse()?;
        let mut profile = self.get_user(user_id).await?;
        profile.is_caregiver = edit.is_caregiver;
        profile.linked_patient = edit.linked_patient;

        let saved = self.store.upsert_profile(&profile).await?;
        info!("Updated user {}", user_id);
        Ok(saved)
    }

    /// Removes the profile. The user's bookings stay on record: approved ones
    /// are cancelled (releasing their slot), pending ones rejected.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: UserId) -> Result<UserDeletion, AdminError> {
        let mut deletion = UserDeletion {
            user_id,
            ..UserDeletion::default()
        };

        for booking in self.ledger.list_active_for_user(user_id).await? {
            let result = match booking.status {
                BookingStatus::Approved => self
                    .workflow
                    .cancel(booking.id, CancelledBy::Admin)
                    .await
                    .map(|report| report.booking),
                _ => self.ledger.reject(booking.id).await,
            };

            match result {
                Ok(updated) if updated.status == BookingStatus::Cancelled => deletion.cancelled.push(updated.id),
                Ok(updated) => deletion.rejected.push(updated.id),
                Err(
                    e @ (BookingError::AlreadyDecided { .. }
                    | BookingError::AlreadyCancelled
                    | BookingError::InvalidStatusTransition { .. }),
                ) => warn!("Booking {} changed while deleting user {}: {}", booking.id, user_id, e),
                Err(e) => return Err(e.into()),
            }
        }

        deletion.profile_deleted = self.store.delete_profile(user_id).await?;
        info!(
            "Deleted user {} ({} bookings cancelled, {} rejected)",
            user_id,
            deletion.cancelled.len(),
            deletion.rejected.len()
        );
        Ok(deletion)
    }

    pub async fn list_bookings(&self) -> Result<Vec<Booking>, AdminError> {
        Ok(self.ledger.list_all().await?)
    }

    pub async fn get_booking(&self, booking_id: BookingId) -> Result<Booking, AdminError> {
        Ok(self.ledger.get_by_id(booking_id).await?)
    }

    pub async fn cancel_booking(&self, booking_id: BookingId) -> Result<CancellationReport, AdminError> {
        Ok(self.workflow.cancel(booking_id, CancelledBy::Admin).await?)
    }

    /// Returns the doctor and whether it was newly registered.
    pub async fn add_doctor(&self, payload: &str) -> Result<(Doctor, bool), AdminError> {
        let DoctorPayload { user_id, name } = payload.parse()?;
        let inserted = self.doctors.register(user_id, &name).await?;
        let doctor = self.doctors.require_doctor(user_id).await?;
        Ok((doctor, inserted))
    }

    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, AdminError> {
        Ok(self.doctors.list_doctors().await?)
    }

    pub async fn add_slot(&self, payload: &str) -> Result<Slot, AdminError> {
        let SlotPayload { date, time_slot, doctor_id } = payload.parse()?;
        Ok(self.availability.publish_raw(&date, &time_slot, doctor_id).await?)
    }

    pub async fn list_available_slots(&self) -> Result<Vec<SlotListing>, AdminError> {
        Ok(self.availability.list_all_available().await?)
    }

    pub async fn system_stats(&self) -> Result<SystemStats, AdminError> {
        Ok(self.store.stats().await?)
    }

    pub async fn health(&self) -> HealthReport {
        if let Err(e) = self.store.ping().await {
            error!("Health check failed: {}", e);
            return HealthReport {
                storage_ok: false,
                stats: None,
                detail: Some(e.to_string()),
            };
        }

        match self.store.stats().await {
            Ok(stats) => HealthReport {
                storage_ok: true,
                stats: Some(stats),
                detail: None,
            },
            Err(e) => HealthReport {
                storage_ok: true,
                stats: None,
                detail: Some(e.to_string()),
            },
        }
    }
}
