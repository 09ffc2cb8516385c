use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::appointment::AppointmentStatus;
use shared_models::doctor::{DayAvailability, DayOfWeek, TimeRange};
use shared_utils::time::wall_clock;
use shared_utils::AppState;

use crate::models::{BookedSlot, DeleteSlotRequest, DoctorError, FlatSlot, SlotsForDate};
use crate::services::profile::DoctorService;

pub struct AvailabilityService {
    store: Arc<dyn ClinicStore>,
    doctors: DoctorService,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            doctors: DoctorService::new(state),
        }
    }

    /// Replaces the caller's weekly availability.
    pub async fn set_availability(
        &self,
        user_id: Uuid,
        availability: Vec<DayAvailability>,
    ) -> Result<Vec<DayAvailability>, DoctorError> {
        validate_days(&availability)?;

        let mut doctor = self.doctors.for_account(user_id).await?;
        doctor.availability = availability;
        let saved = self.store.save_doctor(&doctor).await?;
        info!("Doctor {} now has {} available day(s)", saved.id, saved.availability.len());
        Ok(saved.availability)
    }

    /// Replaces availability from the flat `{day, start, end}` format.
    pub async fn save_flat_slots(
        &self,
        user_id: Uuid,
        slots: Option<Vec<FlatSlot>>,
    ) -> Result<Vec<DayAvailability>, DoctorError> {
        let slots = slots.ok_or_else(|| DoctorError::Validation("Invalid slots data".to_string()))?;
        let grouped = group_flat_slots(&slots)?;
        self.set_availability(user_id, grouped).await
    }

    pub async fn my_availability(&self, user_id: Uuid) -> Result<Vec<DayAvailability>, DoctorError> {
        Ok(self.doctors.for_account(user_id).await?.availability)
    }

    pub async fn delete_slot(
        &self,
        user_id: Uuid,
        request: DeleteSlotRequest,
    ) -> Result<Vec<DayAvailability>, DoctorError> {
        let day: DayOfWeek = request.day.parse().map_err(DoctorError::Validation)?;
        let mut doctor = self.doctors.for_account(user_id).await?;

        if remove_range(&mut doctor.availability, day, &request.start, &request.end) {
            let saved = self.store.save_doctor(&doctor).await?;
            debug!("Removed {} {}-{} from doctor {}", day, request.start, request.end, saved.id);
            return Ok(saved.availability);
        }
        Ok(doctor.availability)
    }

    /// Declared ranges for the weekday of `date` plus what is already booked
    /// that UTC day.
    pub async fn slots_for_date(
        &self,
        doctor_id: Uuid,
        date: Option<&str>,
    ) -> Result<SlotsForDate, DoctorError> {
        let date = date
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| DoctorError::Validation("doctorId and date are required".to_string()))?;
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| DoctorError::Validation(format!("Invalid date: {}", date)))?;

        let doctor = self
            .store
            .find_doctor(doctor_id)
            .await?
            .ok_or(DoctorError::NotFound)?;

        let day = DayOfWeek::from(date.weekday());
        let slots = doctor
            .availability_for(day)
            .map(|d| d.slots.clone())
            .unwrap_or_default();

        let day_start = date.and_hms_opt(0, 0, 0).map(|t| t.and_utc()).ok_or_else(|| {
            DoctorError::Validation(format!("Invalid date: {}", date))
        })?;
        let day_end = day_start + Duration::days(1);

        let booked = self
            .store
            .appointments_for_doctor(doctor_id)
            .await?
            .into_iter()
            .filter(|a| matches!(a.status, AppointmentStatus::Pending | AppointmentStatus::Confirmed))
            .filter(|a| day_start <= a.start_time && a.start_time < day_end)
            .map(|a| BookedSlot {
                start: wall_clock(a.start_time),
                end: wall_clock(a.end_time),
            })
            .collect();

        Ok(SlotsForDate { slots, booked })
    }
}

fn validate_days(availability: &[DayAvailability]) -> Result<(), DoctorError> {
    for day in availability {
        for range in &day.slots {
            range.validate().map_err(DoctorError::Validation)?;
        }
    }
    Ok(())
}

/// Groups flat entries by day in first-seen order. Entries missing a field
/// are skipped.
pub fn group_flat_slots(slots: &[FlatSlot]) -> Result<Vec<DayAvailability>, DoctorError> {
    let mut grouped: Vec<DayAvailability> = Vec::new();

    for slot in slots {
        let (Some(day), Some(start), Some(end)) = (&slot.day, &slot.start, &slot.end) else {
            debug!("Skipping incomplete slot {:?}", slot);
            continue;
        };
        if day.trim().is_empty() || start.trim().is_empty() || end.trim().is_empty() {
            continue;
        }

        let day: DayOfWeek = day.parse().map_err(DoctorError::Validation)?;
        let range = TimeRange::new(start.trim(), end.trim());

        match grouped.iter_mut().find(|d| d.day == day) {
            Some(existing) => existing.slots.push(range),
            None => grouped.push(DayAvailability { day, slots: vec![range] }),
        }
    }

    Ok(grouped)
}

/// Removes the exact `start`-`end` range from `day`, dropping the day once
/// it has no ranges left. Returns whether anything changed.
pub fn remove_range(availability: &mut Vec<DayAvailability>, day: DayOfWeek, start: &str, end: &str) -> bool {
    let Some(entry) = availability.iter_mut().find(|d| d.day == day) else {
        return false;
    };

    let before = entry.slots.len();
    entry.slots.retain(|r| !(r.start == start && r.end == end));
    let changed = entry.slots.len() != before;

    if entry.slots.is_empty() {
        availability.retain(|d| d.day != day);
        return true;
    }
    changed
}
