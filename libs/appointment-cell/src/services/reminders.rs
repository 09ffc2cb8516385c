use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::appointment::{Appointment, AppointmentStatus, ReminderWindow};
use shared_realtime::{events, ConnectionRegistry, Role};
use shared_utils::AppState;

/// Periodic sweep that reminds patients of confirmed appointments 24 hours
/// and 1 hour ahead.
#[derive(Clone)]
pub struct ReminderService {
    store: Arc<dyn ClinicStore>,
    registry: Arc<dyn ConnectionRegistry>,
}

impl ReminderService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            registry: state.registry.clone(),
        }
    }

    /// Runs [`Self::sweep`] every `period` until the task is aborted.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                match self.sweep(Utc::now()).await {
                    Ok(0) => debug!("Reminder sweep found nothing due"),
                    Ok(sent) => info!("Sent {} appointment reminder(s)", sent),
                    Err(e) => error!("Reminder sweep failed: {}", e),
                }
            }
        })
    }

    /// Sends every reminder due at `now` and returns how many went out.
    ///
    /// Each appointment gets the most specific window it is inside. An
    /// appointment first seen within the hour gets only the 1h reminder and
    /// both flags are set, so it is never reminded twice.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let horizon = now + ReminderWindow::TwentyFourHours.lead_time();
        let upcoming = self.store.appointments_starting_between(now, horizon).await?;

        let mut doctor_names: HashMap<Uuid, String> = HashMap::new();
        let mut sent = 0;

        for appointment in upcoming {
            if appointment.status != AppointmentStatus::Confirmed {
                continue;
            }
            let Some(window) = due_window(&appointment, now) else {
                continue;
            };

            if !doctor_names.contains_key(&appointment.doctor_id) {
                let name = self
                    .store
                    .find_doctor(appointment.doctor_id)
                    .await?
                    .map(|d| d.name)
                    .unwrap_or_default();
                doctor_names.insert(appointment.doctor_id, name);
            }
            let doctor_name = doctor_names.get(&appointment.doctor_id).cloned().unwrap_or_default();

            // Flags are set before the push goes out.
            self.store.mark_reminder_sent(appointment.id, window).await?;
            if window == ReminderWindow::OneHour && !appointment.notified_twenty_four_hours {
                self.store
                    .mark_reminder_sent(appointment.id, ReminderWindow::TwentyFourHours)
                    .await?;
            }

            self.registry
                .notify(
                    Role::Patient,
                    appointment.patient_id,
                    events::APPOINTMENT_REMINDER,
                    json!({
                        "appointmentId": appointment.id,
                        "doctorName": doctor_name,
                        "appointmentTime": appointment.start_time,
                        "window": window.label(),
                    }),
                )
                .await;
            sent += 1;
        }

        Ok(sent)
    }
}

/// The reminder `appointment` is owed at `now`, if any.
pub fn due_window(appointment: &Appointment, now: DateTime<Utc>) -> Option<ReminderWindow> {
    let until = appointment.start_time - now;
    if until < chrono::Duration::zero() {
        return None;
    }

    if until <= ReminderWindow::OneHour.lead_time() {
        return (!appointment.notified_one_hour).then_some(ReminderWindow::OneHour);
    }
    if until <= ReminderWindow::TwentyFourHours.lead_time() {
        return (!appointment.notified_twenty_four_hours).then_some(ReminderWindow::TwentyFourHours);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 7, 8, 0, 0).unwrap()
    }

    fn starting_in(minutes: i64) -> Appointment {
        let start = now() + chrono::Duration::minutes(minutes);
        Appointment::pending(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Ravi".to_string(),
            "555".to_string(),
            start,
            start + chrono::Duration::hours(1),
            None,
            0.0,
        )
    }

    #[test]
    fn picks_the_most_specific_window() {
        assert_eq!(due_window(&starting_in(30), now()), Some(ReminderWindow::OneHour));
        assert_eq!(due_window(&starting_in(60 * 5), now()), Some(ReminderWindow::TwentyFourHours));
        assert_eq!(due_window(&starting_in(60 * 30), now()), None);
        assert_eq!(due_window(&starting_in(-5), now()), None);
    }

    #[test]
    fn sent_flags_suppress_repeats() {
        let mut appt = starting_in(60 * 5);
        appt.notified_twenty_four_hours = true;
        assert_eq!(due_window(&appt, now()), None);

        let mut soon = starting_in(20);
        soon.notified_twenty_four_hours = true;
        assert_eq!(due_window(&soon, now()), Some(ReminderWindow::OneHour));
        soon.notified_one_hour = true;
        assert_eq!(due_window(&soon, now()), None);
    }
}
