use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_realtime::{events, ConnectionId, ConnectionRegistry, Envelope, Outlet, Role, SignalingRooms};
use shared_utils::AppState;

use crate::models::{ClientEvent, SocketError};

/// Server side of one open socket. Owns nothing but ids; the registry holds
/// the outlet and the rooms hold membership.
pub struct SocketSession {
    connection: ConnectionId,
    account: Uuid,
    store: Arc<dyn ClinicStore>,
    registry: Arc<dyn ConnectionRegistry>,
    rooms: Arc<SignalingRooms>,
}

impl SocketSession {
    /// Attaches `outlet` under a fresh connection id for the account the
    /// token named.
    pub async fn open(state: &AppState, account: Uuid, outlet: Outlet) -> Self {
        let connection = Uuid::new_v4();
        state.registry.attach(connection, outlet).await;
        info!("Socket {} opened for {}", connection, account);

        Self {
            connection,
            account,
            store: state.store.clone(),
            registry: state.registry.clone(),
            rooms: state.rooms.clone(),
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection
    }

    /// Handles one text frame. Rejections are reported to the sender as an
    /// `error` frame.
    pub async fn on_text(&self, text: &str) {
        let result = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.handle(event).await,
            Err(e) => Err(SocketError::Malformed(e.to_string())),
        };

        if let Err(e) = result {
            warn!("Rejected socket event from {}: {}", self.connection, e);
            self.reply(events::ERROR, json!({ "message": e.to_string() })).await;
        }
    }

    #[instrument(skip(self), fields(connection = %self.connection))]
    pub async fn handle(&self, event: ClientEvent) -> Result<(), SocketError> {
        match event {
            ClientEvent::RegisterDoctor(doctor_id) => self.register_doctor(doctor_id).await,
            ClientEvent::RegisterPatient(patient_id) => self.register_patient(patient_id).await,
            ClientEvent::JoinVideoRoom(room) => self.join_room(&room).await,
            ClientEvent::LeaveVideoRoom(room) => self.leave_room(&room).await,
            ClientEvent::Offer(signal) => {
                self.relay(&signal.room_id, events::OFFER, json!({ "offer": signal.payload.offer }))
                    .await
            }
            ClientEvent::Answer(signal) => {
                self.relay(&signal.room_id, events::ANSWER, json!({ "answer": signal.payload.answer }))
                    .await
            }
            ClientEvent::IceCandidate(signal) => {
                self.relay(
                    &signal.room_id,
                    events::ICE_CANDIDATE,
                    json!({ "candidate": signal.payload.candidate }),
                )
                .await
            }
        }
    }

    /// Unregisters the connection and tells every room it was in.
    pub async fn close(&self) {
        self.registry.unregister(self.connection).await;

        for (room, remaining) in self.rooms.leave_all(self.connection).await {
            debug!("Socket {} left room {} on disconnect", self.connection, room);
            self.broadcast(&remaining, events::USER_DISCONNECTED, json!(self.connection))
                .await;
        }
        info!("Socket {} closed", self.connection);
    }

    async fn register_doctor(&self, doctor_id: Uuid) -> Result<(), SocketError> {
        let doctor = self
            .store
            .find_doctor(doctor_id)
            .await?
            .ok_or(SocketError::DoctorNotFound)?;
        if doctor.user_id != self.account {
            return Err(SocketError::NotYourDoctorProfile);
        }

        self.registry.register(Role::Doctor, doctor_id, self.connection).await;
        self.reply(events::REGISTERED, json!({ "role": Role::Doctor, "userId": doctor_id }))
            .await;
        Ok(())
    }

    async fn register_patient(&self, patient_id: Uuid) -> Result<(), SocketError> {
        if patient_id != self.account {
            return Err(SocketError::NotYourPatientId);
        }

        self.registry.register(Role::Patient, patient_id, self.connection).await;
        self.reply(events::REGISTERED, json!({ "role": Role::Patient, "userId": patient_id }))
            .await;
        Ok(())
    }

    /// Rooms are appointments; only their patient and doctor get in.
    async fn join_room(&self, room: &str) -> Result<(), SocketError> {
        let appointment_id = room_id(room)?;
        let appointment = self
            .store
            .find_appointment(appointment_id)
            .await?
            .ok_or(SocketError::AppointmentNotFound)?;

        let allowed = appointment.patient_id == self.account
            || self
                .store
                .find_doctor(appointment.doctor_id)
                .await?
                .is_some_and(|doctor| doctor.user_id == self.account);
        if !allowed {
            return Err(SocketError::NotParticipant);
        }

        let room = appointment_id.to_string();
        let peers = self.rooms.join(&room, self.connection).await;
        self.reply(events::ROOM_JOINED, json!(room)).await;
        self.broadcast(&peers, events::USER_CONNECTED, json!(self.connection)).await;
        Ok(())
    }

    async fn leave_room(&self, room: &str) -> Result<(), SocketError> {
        let remaining = self
            .rooms
            .leave(&room_id(room)?.to_string(), self.connection)
            .await
            .ok_or(SocketError::NotInRoom)?;
        self.broadcast(&remaining, events::USER_DISCONNECTED, json!(self.connection))
            .await;
        Ok(())
    }

    async fn relay(&self, room: &str, event: &str, mut data: Value) -> Result<(), SocketError> {
        let peers = self
            .rooms
            .peers(&room_id(room)?.to_string(), self.connection)
            .await
            .ok_or(SocketError::NotInRoom)?;

        data["senderId"] = json!(self.connection);
        self.broadcast(&peers, event, data).await;
        Ok(())
    }

    async fn broadcast(&self, connections: &[ConnectionId], event: &str, data: Value) {
        for connection in connections {
            if !self.registry.send_to(*connection, Envelope::new(event, data.clone())).await {
                debug!("Peer {} is gone, {} not delivered", connection, event);
            }
        }
    }

    async fn reply(&self, event: &str, data: Value) {
        self.registry.send_to(self.connection, Envelope::new(event, data)).await;
    }
}

/// Rooms are keyed by appointment id in canonical form.
fn room_id(room: &str) -> Result<Uuid, SocketError> {
    Uuid::parse_str(room.trim()).map_err(|_| SocketError::InvalidRoom)
}
