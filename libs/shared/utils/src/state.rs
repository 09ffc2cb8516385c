use std::sync::Arc;

use axum::extract::FromRef;

use shared_config::AppConfig;
use shared_database::{ClinicStore, InMemoryStore};
use shared_realtime::{ConnectionRegistry, InProcessRegistry, SignalingRooms};

/// Everything a handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ClinicStore>,
    pub registry: Arc<dyn ConnectionRegistry>,
    pub rooms: Arc<SignalingRooms>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn ClinicStore>,
        registry: Arc<dyn ConnectionRegistry>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            rooms: Arc::new(SignalingRooms::new()),
        }
    }

    /// Single-instance state with process-local storage.
    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryStore::new()),
            Arc::new(InProcessRegistry::new()),
        )
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
