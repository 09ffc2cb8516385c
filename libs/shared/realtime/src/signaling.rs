use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::debug;

use crate::models::ConnectionId;

/// Video-call rooms keyed by appointment id. Membership only; no media.
#[derive(Default)]
pub struct SignalingRooms {
    rooms: RwLock<HashMap<String, HashSet<ConnectionId>>>,
}

impl SignalingRooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `connection` to `room` and returns the members already present.
    pub async fn join(&self, room: &str, connection: ConnectionId) -> Vec<ConnectionId> {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(room.to_string()).or_default();
        let peers: Vec<ConnectionId> = members.iter().copied().filter(|c| *c != connection).collect();
        members.insert(connection);
        debug!("Connection {} joined room {} ({} peers)", connection, room, peers.len());
        peers
    }

    /// Removes `connection` from `room`; returns the remaining members, or
    /// `None` when it was not in the room.
    pub async fn leave(&self, room: &str, connection: ConnectionId) -> Option<Vec<ConnectionId>> {
        let mut rooms = self.rooms.write().await;
        let members = rooms.get_mut(room)?;
        if !members.remove(&connection) {
            return None;
        }
        let remaining: Vec<ConnectionId> = members.iter().copied().collect();
        if remaining.is_empty() {
            rooms.remove(room);
        }
        Some(remaining)
    }

    /// Removes `connection` from every room. Returns each room it left with
    /// the members still in it.
    pub async fn leave_all(&self, connection: ConnectionId) -> Vec<(String, Vec<ConnectionId>)> {
        let mut rooms = self.rooms.write().await;
        let mut left = Vec::new();
        rooms.retain(|room, members| {
            if members.remove(&connection) {
                left.push((room.clone(), members.iter().copied().collect()));
            }
            !members.is_empty()
        });
        left
    }

    /// Other members of `room`, or `None` when `connection` is not a member.
    pub async fn peers(&self, room: &str, connection: ConnectionId) -> Option<Vec<ConnectionId>> {
        let rooms = self.rooms.read().await;
        let members = rooms.get(room)?;
        if !members.contains(&connection) {
            return None;
        }
        Some(members.iter().copied().filter(|c| *c != connection).collect())
    }
}
