pub mod gateway;
pub mod payment;
pub mod signature;

pub use gateway::{PaymentGateway, RazorpayGateway};
pub use payment::PaymentService;
