use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use shared_models::doctor::Doctor;
use shared_models::error::AppError;
use shared_models::patient::HistoryEntry;

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor is already in favorites")]
    AlreadyFavorite,

    #[error("Doctor is not in favorites")]
    NotFavorite,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::DoctorNotFound => AppError::NotFound(err.to_string()),
            PatientError::AlreadyFavorite | PatientError::NotFavorite => AppError::BadRequest(err.to_string()),
            PatientError::Validation(msg) => AppError::BadRequest(msg),
            PatientError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

/// Fields a patient may change on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub image_url: Option<String>,
}

/// `{answers: {question: answer}}`. The map keeps submission order.
#[derive(Debug, Clone, Deserialize)]
pub struct PostHistoryRequest {
    pub answers: Option<Map<String, Value>>,
}

impl PostHistoryRequest {
    pub fn into_entries(self) -> Option<Vec<HistoryEntry>> {
        let answers = self.answers?;
        Some(
            answers
                .into_iter()
                .map(|(question, answer)| HistoryEntry {
                    question,
                    answer: match answer {
                        Value::String(text) => text,
                        Value::Null => String::new(),
                        other => other.to_string(),
                    },
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFavoriteRequest {
    pub doctor_id: Option<Uuid>,
}

/// What a favourites list shows of each doctor.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteDoctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub image_url: String,
    pub consultation_fee: f64,
}

impl From<&Doctor> for FavoriteDoctor {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
            image_url: doctor.image_url.clone(),
            consultation_fee: doctor.consultation_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn history_keeps_submission_order() {
        let req: PostHistoryRequest = serde_json::from_str(
            r#"{"answers": {"Smoker?": "No", "Allergies?": "Penicillin", "Age at diagnosis": 42}}"#,
        )
        .unwrap();

        let entries = req.into_entries().unwrap();
        let questions: Vec<&str> = entries.iter().map(|e| e.question.as_str()).collect();
        assert_eq!(questions, vec!["Smoker?", "Allergies?", "Age at diagnosis"]);
        assert_eq!(entries[2].answer, "42");
    }

    #[test]
    fn missing_answers_are_none() {
        let req: PostHistoryRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.into_entries().is_none());
    }

    #[test]
    fn profile_update_is_allow_listed() {
        assert!(serde_json::from_value::<UpdatePatientRequest>(json!({ "bloodGroup": "O+" })).is_ok());
        assert!(serde_json::from_value::<UpdatePatientRequest>(json!({ "favorites": [] })).is_err());
    }
}
