use std::sync::Arc;

use tracing::{debug, info};

use shared_database::ClinicStore;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::patient::{HistoryEntry, Patient};
use shared_utils::AppState;

use crate::models::{PatientError, PostHistoryRequest, UpdatePatientRequest};

pub struct PatientService {
    store: Arc<dyn ClinicStore>,
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// The caller's patient record, created from the token claims the first
    /// time it is needed.
    pub async fn profile(&self, user: &User) -> Result<Patient, AppError> {
        let id = user.account_id()?;
        if let Some(patient) = self.store.find_patient(id).await.map_err(PatientError::from)? {
            debug!("Found patient record {}", id);
            return Ok(patient);
        }

        let patient = Patient::new(id, user.display_name(), user.email.clone());
        let saved = self.store.save_patient(&patient).await.map_err(PatientError::from)?;
        info!("Created patient record {}", saved.id);
        Ok(saved)
    }

    pub async fn update_profile(&self, user: &User, update: UpdatePatientRequest) -> Result<Patient, AppError> {
        let mut patient = self.profile(user).await?;

        if let Some(name) = update.name.map(|n| n.trim().to_string()) {
            if name.is_empty() {
                return Err(PatientError::Validation("Name cannot be empty".to_string()).into());
            }
            patient.name = name;
        }
        if update.contact.is_some() {
            patient.contact = update.contact;
        }
        if update.age.is_some() {
            patient.age = update.age;
        }
        if update.gender.is_some() {
            patient.gender = update.gender;
        }
        if update.address.is_some() {
            patient.address = update.address;
        }
        if update.blood_group.is_some() {
            patient.blood_group = update.blood_group;
        }
        if update.image_url.is_some() {
            patient.image_url = update.image_url;
        }

        Ok(self.store.save_patient(&patient).await.map_err(PatientError::from)?)
    }

    /// Replaces the caller's medical history with the submitted answers.
    pub async fn save_history(&self, user: &User, request: PostHistoryRequest) -> Result<Vec<HistoryEntry>, AppError> {
        let entries = request
            .into_entries()
            .ok_or_else(|| PatientError::Validation("Answers are required".to_string()))?;

        let mut patient = self.profile(user).await?;
        patient.medical_history = entries;
        let saved = self.store.save_patient(&patient).await.map_err(PatientError::from)?;

        info!("Saved {} history answer(s) for patient {}", saved.medical_history.len(), saved.id);
        Ok(saved.medical_history)
    }

    pub async fn history(&self, user: &User) -> Result<Vec<HistoryEntry>, AppError> {
        Ok(self.profile(user).await?.medical_history)
    }
}
