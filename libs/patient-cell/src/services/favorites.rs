use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{FavoriteDoctor, PatientError};
use crate::services::patient::PatientService;

pub struct FavoritesService {
    store: Arc<dyn ClinicStore>,
    patients: PatientService,
}

impl FavoritesService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            patients: PatientService::new(state),
        }
    }

    pub async fn add(&self, user: &User, doctor_id: Option<Uuid>) -> Result<Vec<Uuid>, AppError> {
        let doctor_id = doctor_id.ok_or_else(|| PatientError::Validation("Doctor ID is required.".to_string()))?;

        let mut patient = self.patients.profile(user).await?;
        if self.store.find_doctor(doctor_id).await.map_err(PatientError::from)?.is_none() {
            return Err(PatientError::DoctorNotFound.into());
        }
        if patient.favorites.contains(&doctor_id) {
            return Err(PatientError::AlreadyFavorite.into());
        }

        patient.favorites.push(doctor_id);
        let saved = self.store.save_patient(&patient).await.map_err(PatientError::from)?;
        info!("Patient {} added doctor {} to favorites", saved.id, doctor_id);
        Ok(saved.favorites)
    }

    pub async fn remove(&self, user: &User, doctor_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let mut patient = self.patients.profile(user).await?;
        if !patient.favorites.contains(&doctor_id) {
            return Err(PatientError::NotFavorite.into());
        }

        patient.favorites.retain(|id| *id != doctor_id);
        let saved = self.store.save_patient(&patient).await.map_err(PatientError::from)?;
        info!("Patient {} removed doctor {} from favorites", saved.id, doctor_id);
        Ok(saved.favorites)
    }

    /// Favourite doctors in the order they were added. Listings deleted
    /// since are skipped.
    pub async fn list(&self, user: &User) -> Result<Vec<FavoriteDoctor>, AppError> {
        let patient = self.patients.profile(user).await?;

        let mut favorites = Vec::with_capacity(patient.favorites.len());
        for doctor_id in &patient.favorites {
            match self.store.find_doctor(*doctor_id).await.map_err(PatientError::from)? {
                Some(doctor) => favorites.push(FavoriteDoctor::from(&doctor)),
                None => warn!("Favorite doctor {} of patient {} no longer exists", doctor_id, patient.id),
            }
        }
        Ok(favorites)
    }
}
