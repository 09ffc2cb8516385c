use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::doctor::Doctor;
use shared_realtime::{events, ConnectionRegistry, Role};
use shared_utils::AppState;

use crate::models::{DoctorError, ScheduledAppointment, StatusUpdateRequest};

pub struct ScheduleService {
    store: Arc<dyn ClinicStore>,
    registry: Arc<dyn ConnectionRegistry>,
    default_fee: f64,
}

impl ScheduleService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            registry: state.registry.clone(),
            default_fee: state.config.default_consultation_fee,
        }
    }

    /// Every appointment of the caller's listing, by start time.
    pub async fn scheduled_appointments(&self, user_id: Uuid) -> Result<Vec<ScheduledAppointment>, DoctorError> {
        let doctor = self
            .store
            .find_doctor_by_user(user_id)
            .await?
            .ok_or(DoctorError::NotFound)?;

        let appointments = self.store.appointments_for_doctor(doctor.id).await?;
        Ok(appointments
            .into_iter()
            .map(|a| scheduled(a, &doctor, self.default_fee))
            .collect())
    }

    /// Moves one of the caller's appointments along its lifecycle and tells
    /// the patient.
    #[instrument(skip(self, request), fields(user_id = %user_id, appointment_id = %appointment_id))]
    pub async fn update_status(
        &self,
        user_id: Uuid,
        appointment_id: Uuid,
        request: StatusUpdateRequest,
    ) -> Result<Appointment, DoctorError> {
        let doctor = self
            .store
            .find_doctor_by_user(user_id)
            .await?
            .ok_or(DoctorError::NotFound)?;

        let appointment = self
            .store
            .find_appointment(appointment_id)
            .await?
            .ok_or(DoctorError::AppointmentNotFound)?;

        if appointment.doctor_id != doctor.id {
            warn!("Doctor {} tried to update appointment of doctor {}", doctor.id, appointment.doctor_id);
            return Err(DoctorError::NotYourAppointment);
        }

        let target = request.status;
        if !appointment.status.can_transition_to(target) {
            return Err(DoctorError::InvalidTransition {
                from: appointment.status,
                to: target,
            });
        }

        let reason = if target == AppointmentStatus::Cancelled {
            request.rejection_reason.trim().to_string()
        } else {
            String::new()
        };

        let updated = self
            .store
            .update_status(appointment.id, appointment.status, target, &reason)
            .await?
            .ok_or(DoctorError::StatusChanged)?;

        info!("Appointment {} moved {} -> {}", updated.id, appointment.status, updated.status);

        let mut payload = json!({
            "appointmentId": updated.id,
            "status": updated.status,
            "doctorName": doctor.name,
        });
        if updated.status == AppointmentStatus::Cancelled {
            payload["rejectionReason"] = json!(updated.rejection_reason);
        }
        self.registry
            .notify(Role::Patient, updated.patient_id, events::APPOINTMENT_STATUS, payload)
            .await;

        Ok(updated)
    }
}

/// Amount falls back to the doctor's fee, then the clinic default.
pub fn scheduled(appointment: Appointment, doctor: &Doctor, default_fee: f64) -> ScheduledAppointment {
    let amount = [appointment.payment.amount, doctor.consultation_fee, default_fee]
        .into_iter()
        .find(|a| *a > 0.0)
        .unwrap_or(default_fee);

    ScheduledAppointment {
        id: appointment.id,
        patient_id: appointment.patient_id,
        patient_name: appointment.patient_name,
        patient_contact: appointment.patient_contact,
        appointment_time: appointment.start_time,
        appointment_end_time: appointment.end_time,
        reason: appointment.reason,
        status: appointment.status,
        rejection_reason: appointment.rejection_reason,
        payment_status: appointment.payment.payment_status,
        payment_id: appointment.payment.payment_id,
        amount,
        created_at: appointment.created_at,
    }
}
