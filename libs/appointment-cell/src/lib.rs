pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::BookingError;
pub use services::{BookingService, ReminderService};
