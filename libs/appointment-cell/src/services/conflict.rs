use chrono::{DateTime, Datelike, Utc};

use shared_models::doctor::{DayOfWeek, Doctor};

/// Whether `[start, end)` lies inside one declared range of its weekday,
/// read as UTC wall clock. Intervals crossing midnight never fit.
pub fn fits_availability(doctor: &Doctor, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    if start.date_naive() != end.date_naive() {
        return false;
    }

    doctor
        .availability_for(DayOfWeek::from(start.weekday()))
        .map(|day| day.slots.iter().any(|range| range.covers(start.time(), end.time())))
        .unwrap_or(false)
}
