use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{ConnectionId, Envelope, Outlet, Role};

/// Which live connections belong to which doctor or patient.
///
/// Delivery is best-effort and at-most-once: a notify for a user with no
/// registered connection is dropped, never queued.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Attach the outbound channel of a freshly opened socket.
    async fn attach(&self, connection: ConnectionId, outlet: Outlet);
    /// Map `connection` under `(role, user_id)`. Registering twice is a no-op.
    async fn register(&self, role: Role, user_id: Uuid, connection: ConnectionId);
    /// Forget `connection` everywhere and drop its outlet.
    async fn unregister(&self, connection: ConnectionId);
    async fn list_connections(&self, role: Role, user_id: Uuid) -> Vec<ConnectionId>;
    /// Direct send to one connection. `false` if it is gone.
    async fn send_to(&self, connection: ConnectionId, envelope: Envelope) -> bool;
    /// Fan `event` out to every connection registered under `(role, user_id)`.
    async fn notify(&self, role: Role, user_id: Uuid, event: &str, payload: Value);
}

#[derive(Default)]
struct RegistryState {
    outlets: HashMap<ConnectionId, Outlet>,
    doctors: HashMap<Uuid, Vec<ConnectionId>>,
    patients: HashMap<Uuid, Vec<ConnectionId>>,
}

impl RegistryState {
    fn entries(&self, role: Role) -> &HashMap<Uuid, Vec<ConnectionId>> {
        match role {
            Role::Doctor => &self.doctors,
            Role::Patient => &self.patients,
        }
    }

    fn entries_mut(&mut self, role: Role) -> &mut HashMap<Uuid, Vec<ConnectionId>> {
        match role {
            Role::Doctor => &mut self.doctors,
            Role::Patient => &mut self.patients,
        }
    }
}

fn prune(entries: &mut HashMap<Uuid, Vec<ConnectionId>>, connection: ConnectionId) {
    entries.retain(|_, connections| {
        connections.retain(|c| *c != connection);
        !connections.is_empty()
    });
}

/// Registry for a single server instance.
#[derive(Default)]
pub struct InProcessRegistry {
    state: RwLock<RegistryState>,
}

impl InProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local fan-out. Returns how many connections accepted the envelope.
    pub async fn deliver(&self, role: Role, user_id: Uuid, envelope: &Envelope) -> usize {
        let state = self.state.read().await;
        let Some(connections) = state.entries(role).get(&user_id) else {
            return 0;
        };

        let mut delivered = 0;
        for connection in connections {
            match state.outlets.get(connection) {
                Some(outlet) if outlet.send(envelope.clone()).is_ok() => delivered += 1,
                _ => debug!("Connection {} has no open outlet", connection),
            }
        }
        delivered
    }
}

#[async_trait]
impl ConnectionRegistry for InProcessRegistry {
    async fn attach(&self, connection: ConnectionId, outlet: Outlet) {
        self.state.write().await.outlets.insert(connection, outlet);
        debug!("Attached connection {}", connection);
    }

    async fn register(&self, role: Role, user_id: Uuid, connection: ConnectionId) {
        let mut state = self.state.write().await;
        let connections = state.entries_mut(role).entry(user_id).or_default();
        if !connections.contains(&connection) {
            connections.push(connection);
        }
        debug!("Registered {} {} on connection {}", role, user_id, connection);
    }

    async fn unregister(&self, connection: ConnectionId) {
        let mut state = self.state.write().await;
        state.outlets.remove(&connection);
        prune(&mut state.doctors, connection);
        prune(&mut state.patients, connection);
        debug!("Unregistered connection {}", connection);
    }

    async fn list_connections(&self, role: Role, user_id: Uuid) -> Vec<ConnectionId> {
        let state = self.state.read().await;
        state.entries(role).get(&user_id).cloned().unwrap_or_default()
    }

    async fn send_to(&self, connection: ConnectionId, envelope: Envelope) -> bool {
        let state = self.state.read().await;
        state
            .outlets
            .get(&connection)
            .map(|outlet| outlet.send(envelope).is_ok())
            .unwrap_or(false)
    }

    async fn notify(&self, role: Role, user_id: Uuid, event: &str, payload: Value) {
        let envelope = Envelope::new(event, payload);
        let delivered = self.deliver(role, user_id, &envelope).await;
        if delivered == 0 {
            warn!("No live connection for {} {}, dropping {}", role, user_id, event);
        } else {
            debug!("Delivered {} to {} connection(s) of {} {}", event, delivered, role, user_id);
        }
    }
}
