use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_DOCTOR_IMAGE: &str = "https://api.dicebear.com/7.x/adventurer/svg?seed=doctor";

/// Doctor aggregate: profile plus weekly availability. Appointments live in
/// their own collection keyed by `doctor_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    /// Owning account.
    pub user_id: Uuid,
    pub name: String,
    pub specialty: String,
    pub description: String,
    pub consultation_fee: f64,
    pub image_url: String,
    pub qualifications: String,
    pub years_of_experience: u32,
    pub contact_number: String,
    pub clinic_name: String,
    pub clinic_address: String,
    pub registration_number: String,
    pub gender: Gender,
    #[serde(default)]
    pub languages: Vec<String>,
    pub linked_in: Option<String>,
    pub awards: Option<String>,
    pub services: Option<String>,
    #[serde(default)]
    pub availability: Vec<DayAvailability>,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    pub fn availability_for(&self, day: DayOfWeek) -> Option<&DayAvailability> {
        self.availability.iter().find(|d| d.day == day)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(DayOfWeek::Monday),
            "tuesday" | "tue" => Ok(DayOfWeek::Tuesday),
            "wednesday" | "wed" => Ok(DayOfWeek::Wednesday),
            "thursday" | "thu" => Ok(DayOfWeek::Thursday),
            "friday" | "fri" => Ok(DayOfWeek::Friday),
            "saturday" | "sat" => Ok(DayOfWeek::Saturday),
            "sunday" | "sun" => Ok(DayOfWeek::Sunday),
            other => Err(format!("Unknown day of week: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayAvailability {
    pub day: DayOfWeek,
    pub slots: Vec<TimeRange>,
}

/// A wall-clock range such as `09:00`–`12:00`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self { start: start.into(), end: end.into() }
    }

    pub fn bounds(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((parse_wall_clock(&self.start)?, parse_wall_clock(&self.end)?))
    }

    /// Well-formed times with `start < end`.
    pub fn validate(&self) -> Result<(), String> {
        match self.bounds() {
            Some((start, end)) if start < end => Ok(()),
            Some(_) => Err(format!("Slot {}-{} must start before it ends", self.start, self.end)),
            None => Err(format!("Slot {}-{} is not in HH:MM format", self.start, self.end)),
        }
    }

    /// `start <= at < end`.
    pub fn contains(&self, at: NaiveTime) -> bool {
        self.bounds()
            .map(|(start, end)| start <= at && at < end)
            .unwrap_or(false)
    }

    /// `[from, to)` lies entirely inside this range.
    pub fn covers(&self, from: NaiveTime, to: NaiveTime) -> bool {
        self.bounds()
            .map(|(start, end)| start <= from && to <= end)
            .unwrap_or(false)
    }
}

pub fn parse_wall_clock(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        parse_wall_clock(s).unwrap()
    }

    #[test]
    fn time_range_validation() {
        assert!(TimeRange::new("09:00", "12:00").validate().is_ok());
        assert!(TimeRange::new("12:00", "09:00").validate().is_err());
        assert!(TimeRange::new("09:00", "09:00").validate().is_err());
        assert!(TimeRange::new("9am", "12:00").validate().is_err());
    }

    #[test]
    fn contains_is_half_open() {
        let range = TimeRange::new("09:00", "12:00");
        assert!(range.contains(t("09:00")));
        assert!(range.contains(t("11:59")));
        assert!(!range.contains(t("12:00")));
    }

    #[test]
    fn covers_requires_whole_interval() {
        let range = TimeRange::new("09:00", "12:00");
        assert!(range.covers(t("09:00"), t("10:00")));
        assert!(range.covers(t("11:00"), t("12:00")));
        assert!(!range.covers(t("11:30"), t("12:30")));
    }

    #[test]
    fn day_of_week_round_trips_names() {
        assert_eq!("Monday".parse::<DayOfWeek>(), Ok(DayOfWeek::Monday));
        assert_eq!("sun".parse::<DayOfWeek>(), Ok(DayOfWeek::Sunday));
        assert_eq!(DayOfWeek::from(Weekday::Wed).to_string(), "Wednesday");
        assert_eq!(serde_json::to_string(&DayOfWeek::Friday).unwrap(), "\"Friday\"");
    }
}
