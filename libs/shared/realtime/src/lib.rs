pub mod backplane;
pub mod models;
pub mod registry;
pub mod signaling;

pub use backplane::RedisBackplane;
pub use models::{events, ConnectionId, Envelope, Outlet, RealtimeError, Role};
pub use registry::{ConnectionRegistry, InProcessRegistry};
pub use signaling::SignalingRooms;
