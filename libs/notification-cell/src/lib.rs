pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{ClientEvent, SocketError};
pub use services::SocketSession;
