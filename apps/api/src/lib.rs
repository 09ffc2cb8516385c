pub mod router;

use std::sync::Arc;

use http::Method;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use shared_config::{AppConfig, StorageBackend};
use shared_database::{ClinicStore, InMemoryStore, PostgrestStore};
use shared_realtime::{ConnectionRegistry, InProcessRegistry, RedisBackplane};
use shared_utils::AppState;

pub use router::create_router;

/// Builds the shared state from configuration. With `REDIS_URL` set the
/// registry goes through the Redis backplane and the returned handle is its
/// subscriber task.
pub async fn build_state(config: AppConfig) -> (AppState, Option<JoinHandle<()>>) {
    let store: Arc<dyn ClinicStore> = match config.storage_backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage, records are lost on restart");
            Arc::new(InMemoryStore::new())
        }
        StorageBackend::Supabase => {
            info!("Using PostgREST storage at {}", config.supabase_url);
            Arc::new(PostgrestStore::new(&config))
        }
    };

    let mut subscriber = None;
    let registry: Arc<dyn ConnectionRegistry> = match config.redis_url.clone() {
        Some(url) => match RedisBackplane::connect(&url).await {
            Ok(backplane) => {
                subscriber = Some(backplane.spawn_subscriber(url));
                Arc::new(backplane)
            }
            Err(e) => {
                warn!("Redis backplane unavailable ({}), notifications stay on this instance", e);
                Arc::new(InProcessRegistry::new())
            }
        },
        None => Arc::new(InProcessRegistry::new()),
    };

    (AppState::new(Arc::new(config), store, registry), subscriber)
}

/// Any origin; every method the routers mount, including the `PATCH`
/// appointment status route.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}
