pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::PaymentError;
pub use services::{PaymentGateway, PaymentService, RazorpayGateway};
