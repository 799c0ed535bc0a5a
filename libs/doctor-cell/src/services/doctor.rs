use std::sync::Arc;

use tracing::{debug, info};

use shared_database::BookingStore;
use shared_models::{Doctor, UserId};

use crate::models::DoctorError;

pub struct DoctorService {
    store: Arc<dyn BookingStore>,
}

impl DoctorService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Catalog ordered by name.
    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        Ok(self.store.list_doctors().await?)
    }

    pub async fn get_doctor(&self, doctor_id: UserId) -> Result<Option<Doctor>, DoctorError> {
        Ok(self.store.get_doctor(doctor_id).await?)
    }

    pub async fn require_doctor(&self, doctor_id: UserId) -> Result<Doctor, DoctorError> {
        self.get_doctor(doctor_id)
            .await?
            .ok_or(DoctorError::NotFound(doctor_id))
    }

    /// Display name, falling back to the raw id for unregistered doctors.
    pub async fn display_name(&self, doctor_id: UserId) -> Result<String, DoctorError> {
        Ok(self
            .get_doctor(doctor_id)
            .await?
            .map(|d| d.name)
            .unwrap_or_else(|| format!("Doctor {}", doctor_id)))
    }

    /// Registers a doctor. An already registered id keeps its existing name.
    pub async fn register(&self, user_id: UserId, name: &str) -> Result<bool, DoctorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DoctorError::InvalidName);
        }

        let inserted = self
            .store
            .insert_doctor(&Doctor {
                user_id,
                name: name.to_string(),
            })
            .await?;

        if inserted {
            info!("Registered doctor {} ({})", name, user_id);
        } else {
            debug!("Doctor {} already registered", user_id);
        }
        Ok(inserted)
    }
}
