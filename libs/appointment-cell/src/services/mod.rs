pub mod booking;
pub mod conflict;
pub mod reminders;

pub use booking::BookingService;
pub use reminders::ReminderService;
