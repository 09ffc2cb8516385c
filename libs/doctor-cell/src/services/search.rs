use std::sync::Arc;

use chrono::NaiveTime;
use tracing::debug;

use shared_database::ClinicStore;
use shared_models::doctor::{parse_wall_clock, DayOfWeek, Doctor};
use shared_utils::AppState;

use crate::models::{DoctorError, DoctorSearchQuery};

/// Parsed search filters. Empty strings count as absent.
#[derive(Debug, Default)]
pub struct SearchFilter {
    name: Option<String>,
    specialty: Option<String>,
    max_fee: Option<f64>,
    day: Option<DayOfWeek>,
    slot_time: Option<NaiveTime>,
}

impl TryFrom<DoctorSearchQuery> for SearchFilter {
    type Error = DoctorError;

    fn try_from(query: DoctorSearchQuery) -> Result<Self, Self::Error> {
        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());

        let day = non_empty(query.day)
            .map(|d| d.parse::<DayOfWeek>())
            .transpose()
            .map_err(DoctorError::Validation)?;
        let slot_time = non_empty(query.slot_time)
            .map(|t| parse_wall_clock(&t).ok_or_else(|| DoctorError::Validation(format!("Invalid slotTime: {}", t))))
            .transpose()?;

        Ok(Self {
            name: non_empty(query.name),
            specialty: non_empty(query.specialty),
            max_fee: query.max_fee,
            day,
            slot_time,
        })
    }
}

impl SearchFilter {
    pub fn matches(&self, doctor: &Doctor) -> bool {
        if doctor.availability.is_empty() {
            return false;
        }
        if let Some(name) = &self.name {
            if !doctor.name.to_lowercase().contains(name) {
                return false;
            }
        }
        if let Some(specialty) = &self.specialty {
            if !doctor.specialty.to_lowercase().contains(specialty) {
                return false;
            }
        }
        if let Some(max_fee) = self.max_fee {
            if doctor.consultation_fee > max_fee {
                return false;
            }
        }
        if let Some(day) = self.day {
            let Some(entry) = doctor.availability_for(day) else {
                return false;
            };
            // slotTime only narrows the search together with day.
            if let Some(at) = self.slot_time {
                if !entry.slots.iter().any(|range| range.contains(at)) {
                    return false;
                }
            }
        }
        true
    }
}

pub struct DoctorSearchService {
    store: Arc<dyn ClinicStore>,
}

impl DoctorSearchService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub async fn available_doctors(&self, query: DoctorSearchQuery) -> Result<Vec<Doctor>, DoctorError> {
        let filter = SearchFilter::try_from(query)?;
        let doctors: Vec<Doctor> = self
            .store
            .list_doctors()
            .await?
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect();
        debug!("Search matched {} doctor(s)", doctors.len());
        Ok(doctors)
    }
}
