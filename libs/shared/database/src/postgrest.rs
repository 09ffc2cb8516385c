use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::appointment::{Appointment, AppointmentStatus, PaymentRecord, ReminderWindow};
use shared_models::doctor::Doctor;
use shared_models::patient::Patient;

use crate::store::{BookingOutcome, ClinicStore};
use crate::supabase::{merge_duplicates, return_representation, SupabaseClient};

/// `ClinicStore` over Supabase PostgREST. Overlap safety for bookings comes
/// from the exclusion constraint in `migrations/001_clinic_schema.sql`, which
/// PostgREST reports as 409.
pub struct PostgrestStore {
    client: SupabaseClient,
    service_key: String,
}

impl PostgrestStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: SupabaseClient::with_service_role(config),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(self.service_key.as_str())
    }

    async fn select<T>(&self, path: &str) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        self.client.request(Method::GET, path, self.token(), None).await
    }

    async fn select_one<T>(&self, path: &str) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let rows: Vec<T> = self.select(path).await?;
        Ok(rows.into_iter().next())
    }

    async fn write<T>(&self, method: Method, path: &str, body: Value, upsert: bool) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let headers = if upsert { merge_duplicates() } else { return_representation() };
        self.client
            .request_with_headers(method, path, self.token(), Some(body), Some(headers))
            .await
    }

    async fn overlapping(&self, appointment: &Appointment) -> Result<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&status=neq.Cancelled&start_time=lt.{}&end_time=gt.{}&order=start_time.asc",
            appointment.doctor_id,
            timestamp(appointment.end_time),
            timestamp(appointment.start_time),
        );
        self.select(&path).await
    }
}

/// PostgREST filter literal. `Z` instead of `+00:00` keeps the query string
/// free of `+`.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl ClinicStore for PostgrestStore {
    async fn insert_doctor(&self, doctor: Doctor) -> Result<Doctor> {
        let rows: Vec<Doctor> = self
            .write(Method::POST, "/rest/v1/doctors", serde_json::to_value(&doctor)?, false)
            .await?;
        rows.into_iter().next().ok_or_else(|| anyhow!("insert returned no doctor row"))
    }

    async fn save_doctor(&self, doctor: &Doctor) -> Result<Doctor> {
        let rows: Vec<Doctor> = self
            .write(
                Method::POST,
                "/rest/v1/doctors?on_conflict=id",
                serde_json::to_value(doctor)?,
                true,
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| anyhow!("upsert returned no doctor row"))
    }

    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>> {
        self.select_one(&format!("/rest/v1/doctors?id=eq.{}", id)).await
    }

    async fn find_doctor_by_user(&self, user_id: Uuid) -> Result<Option<Doctor>> {
        self.select_one(&format!("/rest/v1/doctors?user_id=eq.{}", user_id)).await
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        self.select("/rest/v1/doctors?order=created_at.asc").await
    }

    async fn book_if_free(&self, appointment: Appointment) -> Result<BookingOutcome> {
        let response = self
            .client
            .send(
                Method::POST,
                "/rest/v1/appointments",
                self.token(),
                Some(serde_json::to_value(&appointment)?),
                Some(return_representation()),
            )
            .await?;

        if response.status() == StatusCode::CONFLICT {
            // Exclusion constraint fired; report who holds the slot.
            info!("Booking for doctor {} hit the overlap constraint", appointment.doctor_id);
            let existing = self.overlapping(&appointment).await?;
            if existing.is_empty() {
                warn!("Overlap constraint fired but no overlapping rows were found");
            }
            return Ok(BookingOutcome::Conflict(existing));
        }

        let rows: Vec<Appointment> = SupabaseClient::parse_response(response).await?;
        let booked = rows
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("insert returned no appointment row"))?;
        debug!("Booked appointment {}", booked.id);
        Ok(BookingOutcome::Booked(booked))
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        self.select_one(&format!("/rest/v1/appointments?id=eq.{}", id)).await
    }

    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>> {
        self.select(&format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=start_time.asc",
            doctor_id
        ))
        .await
    }

    async fn appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>> {
        self.select(&format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=start_time.asc",
            patient_id
        ))
        .await
    }

    async fn appointments_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>> {
        self.select(&format!(
            "/rest/v1/appointments?start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            timestamp(from),
            timestamp(to)
        ))
        .await
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        status: AppointmentStatus,
        rejection_reason: &str,
    ) -> Result<Option<Appointment>> {
        // The status filter turns the PATCH into a compare-and-set.
        let path = format!("/rest/v1/appointments?id=eq.{}&status=eq.{}", id, expected);
        let rows: Vec<Appointment> = self
            .write(
                Method::PATCH,
                &path,
                json!({ "status": status, "rejection_reason": rejection_reason }),
                false,
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update_payment(
        &self,
        id: Uuid,
        expected: &PaymentRecord,
        payment: &PaymentRecord,
    ) -> Result<Option<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&payment_status=eq.{}&order_id=eq.{}",
            id, expected.payment_status, expected.order_id
        );
        let rows: Vec<Appointment> = self
            .write(
                Method::PATCH,
                &path,
                serde_json::to_value(payment)?,
                false,
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn mark_reminder_sent(&self, id: Uuid, window: ReminderWindow) -> Result<()> {
        let body = match window {
            ReminderWindow::TwentyFourHours => json!({ "notified_twenty_four_hours": true }),
            ReminderWindow::OneHour => json!({ "notified_one_hour": true }),
        };
        let _: Vec<Appointment> = self
            .write(Method::PATCH, &format!("/rest/v1/appointments?id=eq.{}", id), body, false)
            .await?;
        Ok(())
    }

    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>> {
        self.select_one(&format!("/rest/v1/patients?id=eq.{}", id)).await
    }

    async fn save_patient(&self, patient: &Patient) -> Result<Patient> {
        let rows: Vec<Patient> = self
            .write(
                Method::POST,
                "/rest/v1/patients?on_conflict=id",
                serde_json::to_value(patient)?,
                true,
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| anyhow!("upsert returned no patient row"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_use_zulu_suffix() {
        let at = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        assert_eq!(timestamp(at), "2025-03-03T09:00:00.000Z");
    }
}
