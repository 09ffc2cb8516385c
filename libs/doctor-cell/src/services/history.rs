use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_utils::AppState;

use crate::models::{DoctorError, HistoryItem, PatientHistoryResponse};

pub struct PatientHistoryService {
    store: Arc<dyn ClinicStore>,
}

impl PatientHistoryService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// Entries carry no timestamp of their own; `createdAt` is the read time.
    pub async fn history_for(&self, patient_id: Uuid) -> Result<PatientHistoryResponse, DoctorError> {
        let patient = self
            .store
            .find_patient(patient_id)
            .await?
            .ok_or(DoctorError::PatientNotFound)?;

        let now = Utc::now();
        debug!("Reading {} history entries of patient {}", patient.medical_history.len(), patient.id);

        Ok(PatientHistoryResponse {
            history: patient
                .medical_history
                .into_iter()
                .map(|entry| HistoryItem {
                    question: entry.question,
                    answer: entry.answer,
                    created_at: now,
                })
                .collect(),
            patient_name: patient.name,
        })
    }
}
