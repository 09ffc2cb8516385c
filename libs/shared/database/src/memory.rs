use std::collections::HashMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::appointment::{Appointment, AppointmentStatus, PaymentRecord, ReminderWindow};
use shared_models::doctor::Doctor;
use shared_models::patient::Patient;

use crate::store::{BookingOutcome, ClinicStore};

#[derive(Default)]
struct Tables {
    doctors: HashMap<Uuid, Doctor>,
    appointments: HashMap<Uuid, Appointment>,
    patients: HashMap<Uuid, Patient>,
}

/// Process-local store. One lock guards every table, so `book_if_free` and
/// `update_status` are atomic with respect to each other.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_start(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.sort_by_key(|a| a.start_time);
    appointments
}

#[async_trait]
impl ClinicStore for InMemoryStore {
    async fn insert_doctor(&self, doctor: Doctor) -> Result<Doctor> {
        let mut tables = self.tables.write().await;
        if tables.doctors.values().any(|d| d.user_id == doctor.user_id) {
            return Err(anyhow!("account {} already owns a doctor profile", doctor.user_id));
        }
        tables.doctors.insert(doctor.id, doctor.clone());
        Ok(doctor)
    }

    async fn save_doctor(&self, doctor: &Doctor) -> Result<Doctor> {
        let mut tables = self.tables.write().await;
        tables.doctors.insert(doctor.id, doctor.clone());
        Ok(doctor.clone())
    }

    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>> {
        Ok(self.tables.read().await.doctors.get(&id).cloned())
    }

    async fn find_doctor_by_user(&self, user_id: Uuid) -> Result<Option<Doctor>> {
        let tables = self.tables.read().await;
        Ok(tables.doctors.values().find(|d| d.user_id == user_id).cloned())
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        let tables = self.tables.read().await;
        let mut doctors: Vec<Doctor> = tables.doctors.values().cloned().collect();
        doctors.sort_by_key(|d| d.created_at);
        Ok(doctors)
    }

    async fn book_if_free(&self, appointment: Appointment) -> Result<BookingOutcome> {
        let mut tables = self.tables.write().await;

        let conflicts: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.doctor_id == appointment.doctor_id)
            .filter(|a| a.occupies(appointment.start_time, appointment.end_time))
            .cloned()
            .collect();

        if !conflicts.is_empty() {
            debug!("Booking for doctor {} rejected, {} overlapping", appointment.doctor_id, conflicts.len());
            return Ok(BookingOutcome::Conflict(sorted_by_start(conflicts)));
        }

        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(BookingOutcome::Booked(appointment))
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_start(
            tables.appointments.values().filter(|a| a.doctor_id == doctor_id).cloned().collect(),
        ))
    }

    async fn appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_start(
            tables.appointments.values().filter(|a| a.patient_id == patient_id).cloned().collect(),
        ))
    }

    async fn appointments_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_start(
            tables
                .appointments
                .values()
                .filter(|a| from <= a.start_time && a.start_time < to)
                .cloned()
                .collect(),
        ))
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        status: AppointmentStatus,
        rejection_reason: &str,
    ) -> Result<Option<Appointment>> {
        let mut tables = self.tables.write().await;
        match tables.appointments.get_mut(&id) {
            Some(appt) if appt.status == expected => {
                appt.status = status;
                appt.rejection_reason = rejection_reason.to_string();
                Ok(Some(appt.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_payment(
        &self,
        id: Uuid,
        expected: &PaymentRecord,
        payment: &PaymentRecord,
    ) -> Result<Option<Appointment>> {
        let mut tables = self.tables.write().await;
        match tables.appointments.get_mut(&id) {
            Some(appt)
                if appt.payment.payment_status == expected.payment_status
                    && appt.payment.order_id == expected.order_id =>
            {
                appt.payment = payment.clone();
                Ok(Some(appt.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_reminder_sent(&self, id: Uuid, window: ReminderWindow) -> Result<()> {
        let mut tables = self.tables.write().await;
        let appt = tables
            .appointments
            .get_mut(&id)
            .ok_or_else(|| anyhow!("appointment {} not found", id))?;
        match window {
            ReminderWindow::TwentyFourHours => appt.notified_twenty_four_hours = true,
            ReminderWindow::OneHour => appt.notified_one_hour = true,
        }
        Ok(())
    }

    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>> {
        Ok(self.tables.read().await.patients.get(&id).cloned())
    }

    async fn save_patient(&self, patient: &Patient) -> Result<Patient> {
        let mut tables = self.tables.write().await;
        tables.patients.insert(patient.id, patient.clone());
        Ok(patient.clone())
    }
}
