use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::appointment::{Appointment, AppointmentStatus, PaymentStatus};
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("All fields are required.")]
    MissingFields,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor is not available at the requested time")]
    OutsideAvailability,

    #[error("This time slot is already booked. Please choose another time.")]
    SlotTaken { conflicting: Vec<Appointment> },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::MissingFields
            | BookingError::InvalidTime(_)
            | BookingError::OutsideAvailability => AppError::BadRequest(err.to_string()),
            BookingError::DoctorNotFound => AppError::NotFound(err.to_string()),
            BookingError::SlotTaken { .. } => AppError::Conflict(err.to_string()),
            BookingError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

/// Body of `POST /book-appointment/{doctor_id}`. Fields are optional here so
/// missing ones get the clinic's own 400 message rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub patient_name: Option<String>,
    pub patient_contact: Option<String>,
    pub appointment_time: Option<String>,
    pub appointment_end_time: Option<String>,
    pub reason: Option<String>,
}

/// One row of `GET /getmyappointments`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyAppointment {
    pub doctor_name: String,
    pub doctor_specialty: String,
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub contact: String,
    pub date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub rejection_reason: String,
    pub payment_status: PaymentStatus,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}
