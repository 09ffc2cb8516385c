use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Process-local id of one open socket.
pub type ConnectionId = Uuid;

/// Outbound half of a socket. The socket's writer task drains it.
pub type Outlet = mpsc::UnboundedSender<Envelope>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Patient,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Doctor => write!(f, "doctor"),
            Role::Patient => write!(f, "patient"),
        }
    }
}

/// Wire frame: `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub event: String,
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self { event: event.into(), data }
    }
}

#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Event names shared by the HTTP cells and the socket endpoint.
pub mod events {
    pub const NEW_APPOINTMENT: &str = "newAppointment";
    pub const APPOINTMENT_STATUS: &str = "appointmentStatus";
    pub const PAYMENT_RECEIVED: &str = "paymentReceived";
    pub const APPOINTMENT_REMINDER: &str = "appointmentReminder";

    pub const REGISTERED: &str = "registered";
    pub const ROOM_JOINED: &str = "room-joined";
    pub const USER_CONNECTED: &str = "user-connected";
    pub const USER_DISCONNECTED: &str = "user-disconnected";
    pub const OFFER: &str = "offer";
    pub const ANSWER: &str = "answer";
    pub const ICE_CANDIDATE: &str = "ice-candidate";
    pub const ERROR: &str = "error";
}
