use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_database::{BookingOutcome, ClinicStore};
use shared_models::appointment::{default_end_time, Appointment};
use shared_models::doctor::Doctor;
use shared_realtime::{events, ConnectionRegistry, Role};
use shared_utils::time::parse_client_time;
use shared_utils::AppState;

use crate::models::{BookAppointmentRequest, BookingError, MyAppointment};
use crate::services::conflict::fits_availability;

pub struct BookingService {
    store: Arc<dyn ClinicStore>,
    registry: Arc<dyn ConnectionRegistry>,
    enforce_availability_window: bool,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            registry: state.registry.clone(),
            enforce_availability_window: state.config.enforce_availability_window,
        }
    }

    /// Books `[start, end)` with `doctor_id` for the calling patient. The
    /// conflict check and the insert are one atomic store operation, so two
    /// overlapping requests never both succeed.
    #[instrument(skip(self, request), fields(doctor_id = %doctor_id, patient_id = %patient_id))]
    pub async fn book(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let patient_name = required(request.patient_name)?;
        let patient_contact = required(request.patient_contact)?;
        let start = parse_client_time(&required(request.appointment_time)?).map_err(BookingError::InvalidTime)?;

        let end = match request.appointment_end_time.filter(|t| !t.trim().is_empty()) {
            Some(raw) => parse_client_time(&raw).map_err(BookingError::InvalidTime)?,
            None => default_end_time(start),
        };
        if end <= start {
            return Err(BookingError::InvalidTime("end time must be after start time".to_string()));
        }

        let doctor = self
            .store
            .find_doctor(doctor_id)
            .await?
            .ok_or(BookingError::DoctorNotFound)?;

        if self.enforce_availability_window && !fits_availability(&doctor, start, end) {
            debug!("Requested {} - {} is outside the doctor's declared hours", start, end);
            return Err(BookingError::OutsideAvailability);
        }

        let appointment = Appointment::pending(
            doctor.id,
            patient_id,
            patient_name,
            patient_contact,
            start,
            end,
            request.reason.filter(|r| !r.trim().is_empty()),
            doctor.consultation_fee,
        );

        let booked = match self.store.book_if_free(appointment).await? {
            BookingOutcome::Booked(appointment) => appointment,
            BookingOutcome::Conflict(conflicting) => {
                warn!(
                    "Slot {} - {} of doctor {} overlaps {} booking(s)",
                    start,
                    end,
                    doctor.id,
                    conflicting.len()
                );
                return Err(BookingError::SlotTaken { conflicting });
            }
        };

        info!("Booked appointment {} with doctor {}", booked.id, doctor.id);

        self.registry
            .notify(
                Role::Doctor,
                doctor.id,
                events::NEW_APPOINTMENT,
                json!({
                    "appointmentId": booked.id,
                    "patientName": booked.patient_name,
                    "patientContact": booked.patient_contact,
                    "appointmentTime": booked.start_time,
                    "appointmentEndTime": booked.end_time,
                    "reason": booked.reason,
                }),
            )
            .await;

        Ok(booked)
    }

    /// The caller's appointments across every doctor, by start time.
    pub async fn my_appointments(&self, patient_id: Uuid) -> Result<Vec<MyAppointment>, BookingError> {
        let appointments = self.store.appointments_for_patient(patient_id).await?;

        let mut doctors: HashMap<Uuid, Option<Doctor>> = HashMap::new();
        let mut rows = Vec::with_capacity(appointments.len());

        for appointment in appointments {
            if !doctors.contains_key(&appointment.doctor_id) {
                let doctor = self.store.find_doctor(appointment.doctor_id).await?;
                doctors.insert(appointment.doctor_id, doctor);
            }
            let doctor = doctors.get(&appointment.doctor_id).and_then(Option::as_ref);

            rows.push(MyAppointment {
                doctor_name: doctor.map(|d| d.name.clone()).unwrap_or_default(),
                doctor_specialty: doctor.map(|d| d.specialty.clone()).unwrap_or_default(),
                appointment_id: appointment.id,
                patient_name: appointment.patient_name,
                contact: appointment.patient_contact,
                date: appointment.start_time,
                end_date: appointment.end_time,
                reason: appointment.reason,
                status: appointment.status,
                rejection_reason: appointment.rejection_reason,
                payment_status: appointment.payment.payment_status,
                amount: appointment.payment.amount,
                created_at: appointment.created_at,
            });
        }

        rows.sort_by_key(|row| row.date);
        Ok(rows)
    }
}

fn required(value: Option<String>) -> Result<String, BookingError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(BookingError::MissingFields)
}
