use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::appointment::{AppointmentStatus, PaymentStatus};
use shared_models::doctor::{DayAvailability, Gender};
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor profile not found. Create profile first.")]
    ProfileMissing,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("This appointment belongs to another doctor")]
    NotYourAppointment,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment status changed concurrently, reload and retry")]
    StatusChanged,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound
            | DoctorError::ProfileMissing
            | DoctorError::AppointmentNotFound
            | DoctorError::PatientNotFound => AppError::NotFound(err.to_string()),
            DoctorError::NotYourAppointment => AppError::Forbidden(err.to_string()),
            DoctorError::InvalidTransition { .. } | DoctorError::StatusChanged => {
                AppError::Conflict(err.to_string())
            }
            DoctorError::Validation(msg) => AppError::BadRequest(msg),
            DoctorError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

/// `languages` arrives either as a list or as `"English, Hindi"`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Languages {
    List(Vec<String>),
    Csv(String),
}

impl Languages {
    pub fn into_vec(self) -> Vec<String> {
        let items = match self {
            Languages::List(items) => items,
            Languages::Csv(raw) => raw.split(',').map(str::to_string).collect(),
        };
        items
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub name: String,
    pub specialty: String,
    pub description: String,
    #[serde(alias = "consultationFees")]
    pub consultation_fee: f64,
    pub image_url: Option<String>,
    pub qualifications: String,
    pub years_of_experience: u32,
    pub contact_number: String,
    pub clinic_name: String,
    pub clinic_address: String,
    pub registration_number: String,
    pub gender: Gender,
    pub languages: Option<Languages>,
    pub linked_in: Option<String>,
    pub awards: Option<String>,
    pub services: Option<String>,
}

/// Fields a doctor may change on their own profile. Anything else is
/// rejected at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "consultationFees")]
    pub consultation_fee: Option<f64>,
    pub image_url: Option<String>,
    pub qualifications: Option<String>,
    pub years_of_experience: Option<u32>,
    pub contact_number: Option<String>,
    pub clinic_name: Option<String>,
    pub clinic_address: Option<String>,
    pub registration_number: Option<String>,
    pub gender: Option<Gender>,
    pub languages: Option<Languages>,
    pub linked_in: Option<String>,
    pub awards: Option<String>,
    pub services: Option<String>,
}

impl From<CreateListingRequest> for UpdateDoctorRequest {
    fn from(req: CreateListingRequest) -> Self {
        Self {
            name: Some(req.name),
            specialty: Some(req.specialty),
            description: Some(req.description),
            consultation_fee: Some(req.consultation_fee),
            image_url: req.image_url,
            qualifications: Some(req.qualifications),
            years_of_experience: Some(req.years_of_experience),
            contact_number: Some(req.contact_number),
            clinic_name: Some(req.clinic_name),
            clinic_address: Some(req.clinic_address),
            registration_number: Some(req.registration_number),
            gender: Some(req.gender),
            languages: req.languages,
            linked_in: req.linked_in,
            awards: req.awards,
            services: req.services,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetAvailabilityRequest {
    #[serde(default)]
    pub slots: Vec<DayAvailability>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveSlotsRequest {
    pub slots: Option<Vec<FlatSlot>>,
}

/// One `{day, start, end}` entry of the flat slot format.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatSlot {
    pub day: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteSlotRequest {
    pub day: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsForDateQuery {
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSearchQuery {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub max_fee: Option<f64>,
    pub day: Option<String>,
    pub slot_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: AppointmentStatus,
    #[serde(default)]
    pub rejection_reason: String,
}

/// A booked interval on a given day, as `HH:MM` wall clock (UTC).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookedSlot {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotsForDate {
    pub slots: Vec<shared_models::doctor::TimeRange>,
    pub booked: Vec<BookedSlot>,
}

/// Row of the doctor's schedule.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledAppointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub patient_contact: String,
    pub appointment_time: DateTime<Utc>,
    pub appointment_end_time: DateTime<Utc>,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub rejection_reason: String,
    pub payment_status: PaymentStatus,
    pub payment_id: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientHistoryResponse {
    pub history: Vec<HistoryItem>,
    pub patient_name: String,
}
