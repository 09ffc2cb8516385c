use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Frames a client may send: `{"event": name, "data": payload}`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "registerDoctor")]
    RegisterDoctor(Uuid),

    #[serde(rename = "registerPatient")]
    RegisterPatient(Uuid),

    #[serde(rename = "join-video-room")]
    JoinVideoRoom(String),

    #[serde(rename = "leave-video-room")]
    LeaveVideoRoom(String),

    #[serde(rename = "offer")]
    Offer(RoomSignal<OfferPayload>),

    #[serde(rename = "answer")]
    Answer(RoomSignal<AnswerPayload>),

    #[serde(rename = "ice-candidate")]
    IceCandidate(RoomSignal<CandidatePayload>),
}

/// A signaling payload addressed to the other members of a room.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSignal<T> {
    pub room_id: String,
    #[serde(flatten)]
    pub payload: T,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OfferPayload {
    pub offer: Value,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AnswerPayload {
    pub answer: Value,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CandidatePayload {
    pub candidate: Value,
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Reasons a client event is rejected. The message goes back to the client
/// as an `error` frame; the socket stays open.
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Doctor profile not found")]
    DoctorNotFound,

    #[error("You can only register your own doctor profile")]
    NotYourDoctorProfile,

    #[error("You can only register as yourself")]
    NotYourPatientId,

    #[error("Invalid room id")]
    InvalidRoom,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("You are not a participant of this appointment")]
    NotParticipant,

    #[error("Join the room before signaling")]
    NotInRoom,

    #[error("Internal server error")]
    Database(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_register_frames() {
        let id = Uuid::new_v4();
        let event: ClientEvent =
            serde_json::from_value(json!({ "event": "registerDoctor", "data": id })).unwrap();
        assert_eq!(event, ClientEvent::RegisterDoctor(id));

        let event: ClientEvent =
            serde_json::from_value(json!({ "event": "registerPatient", "data": id.to_string() })).unwrap();
        assert_eq!(event, ClientEvent::RegisterPatient(id));
    }

    #[test]
    fn parses_signaling_frames() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "ice-candidate",
            "data": { "roomId": "r1", "candidate": { "sdpMid": "0" } }
        }))
        .unwrap();
        match event {
            ClientEvent::IceCandidate(signal) => {
                assert_eq!(signal.room_id, "r1");
                assert_eq!(signal.payload.candidate["sdpMid"], "0");
            }
            other => panic!("unexpected event {:?}", other),
        }

        let event: ClientEvent =
            serde_json::from_value(json!({ "event": "join-video-room", "data": "r1" })).unwrap();
        assert_eq!(event, ClientEvent::JoinVideoRoom("r1".to_string()));
    }

    #[test]
    fn rejects_unknown_events_and_bad_ids() {
        assert!(serde_json::from_value::<ClientEvent>(json!({ "event": "shutdown", "data": null })).is_err());
        assert!(serde_json::from_value::<ClientEvent>(json!({ "event": "registerDoctor", "data": "42" })).is_err());
        assert!(serde_json::from_value::<ClientEvent>(json!({ "event": "offer", "data": { "offer": {} } })).is_err());
    }
}
