use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of a booking that arrives without an end time.
pub const DEFAULT_APPOINTMENT_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub patient_contact: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub rejection_reason: String,
    #[serde(default)]
    pub notified_twenty_four_hours: bool,
    #[serde(default)]
    pub notified_one_hour: bool,
    #[serde(flatten)]
    pub payment: PaymentRecord,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// A fresh Pending booking.
    pub fn pending(
        doctor_id: Uuid,
        patient_id: Uuid,
        patient_name: String,
        patient_contact: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        reason: Option<String>,
        amount: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            patient_name,
            patient_contact,
            start_time,
            end_time,
            reason,
            status: AppointmentStatus::Pending,
            rejection_reason: String::new(),
            notified_twenty_four_hours: false,
            notified_one_hour: false,
            payment: PaymentRecord {
                amount,
                ..PaymentRecord::default()
            },
            created_at: Utc::now(),
        }
    }

    /// Whether this appointment occupies its interval for conflict purposes.
    pub fn blocks_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        intervals_overlap(self.start_time, self.end_time, start, end)
    }

    /// The booking conflict rule: a non-Cancelled appointment overlapping
    /// `[start, end)`.
    pub fn occupies(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.blocks_slot() && self.overlaps(start, end)
    }

    pub fn reminder_sent(&self, window: ReminderWindow) -> bool {
        match window {
            ReminderWindow::TwentyFourHours => self.notified_twenty_four_hours,
            ReminderWindow::OneHour => self.notified_one_hour,
        }
    }
}

/// `[s1, e1)` and `[s2, e2)` share at least one instant.
pub fn intervals_overlap(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

pub fn default_end_time(start: DateTime<Utc>) -> DateTime<Utc> {
    start + Duration::minutes(DEFAULT_APPOINTMENT_MINUTES)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }

    pub fn can_transition_to(&self, target: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, target),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Cancelled) | (Confirmed, Completed)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "Pending"),
            AppointmentStatus::Confirmed => write!(f, "Confirmed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
            AppointmentStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PaymentRecord {
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReminderWindow {
    TwentyFourHours,
    OneHour,
}

impl ReminderWindow {
    pub fn lead_time(&self) -> Duration {
        match self {
            ReminderWindow::TwentyFourHours => Duration::hours(24),
            ReminderWindow::OneHour => Duration::hours(1),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReminderWindow::TwentyFourHours => "24h",
            ReminderWindow::OneHour => "1h",
        }
    }
}
