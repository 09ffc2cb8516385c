pub mod availability;
pub mod history;
pub mod profile;
pub mod schedule;
pub mod search;

pub use availability::AvailabilityService;
pub use history::PatientHistoryService;
pub use profile::DoctorService;
pub use schedule::ScheduleService;
pub use search::DoctorSearchService;
