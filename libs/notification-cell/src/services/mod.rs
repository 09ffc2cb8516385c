pub mod session;

pub use session::SocketSession;
