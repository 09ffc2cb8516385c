use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_models::appointment::{Appointment, AppointmentStatus, PaymentRecord, ReminderWindow};
use shared_models::doctor::Doctor;
use shared_models::patient::Patient;

/// Result of an atomic conditional booking.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    Booked(Appointment),
    /// Nothing was written; these existing appointments overlap the request.
    Conflict(Vec<Appointment>),
}

/// Persistence for doctors, appointments and patients.
///
/// Appointments are their own collection keyed by `doctor_id`, so booking and
/// status changes are single conditional writes rather than rewrites of the
/// owning doctor.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn insert_doctor(&self, doctor: Doctor) -> Result<Doctor>;
    async fn save_doctor(&self, doctor: &Doctor) -> Result<Doctor>;
    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>>;
    async fn find_doctor_by_user(&self, user_id: Uuid) -> Result<Option<Doctor>>;
    async fn list_doctors(&self) -> Result<Vec<Doctor>>;

    /// Inserts `appointment` iff no non-Cancelled appointment of the same
    /// doctor overlaps its `[start, end)` interval. Check and insert are one
    /// atomic step.
    async fn book_if_free(&self, appointment: Appointment) -> Result<BookingOutcome>;
    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>>;
    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>>;
    async fn appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>>;
    /// Appointments with `from <= start_time < to`, any status.
    async fn appointments_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>>;
    /// Compare-and-set on status. `None` when the appointment is missing or
    /// no longer has status `expected`.
    async fn update_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        status: AppointmentStatus,
        rejection_reason: &str,
    ) -> Result<Option<Appointment>>;
    /// Compare-and-set on the payment sub-record. Writes `payment` only while
    /// the stored record still has the `payment_status` and `order_id` of
    /// `expected`; `None` otherwise.
    async fn update_payment(
        &self,
        id: Uuid,
        expected: &PaymentRecord,
        payment: &PaymentRecord,
    ) -> Result<Option<Appointment>>;
    async fn mark_reminder_sent(&self, id: Uuid, window: ReminderWindow) -> Result<()>;

    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>>;
    /// Insert or replace by id.
    async fn save_patient(&self, patient: &Patient) -> Result<Patient>;
}
