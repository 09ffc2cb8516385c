use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use futures::StreamExt;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{ConnectionId, Envelope, Outlet, RealtimeError, Role};
use crate::registry::{ConnectionRegistry, InProcessRegistry};

pub const DEFAULT_CHANNEL: &str = "telehealth:notifications";

/// What travels over the Redis channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackplaneMessage {
    pub role: Role,
    pub user_id: Uuid,
    pub envelope: Envelope,
}

/// Registry for several server instances. Connections stay local to the
/// instance that owns the socket; `notify` goes through a Redis channel that
/// every instance subscribes to, so the instance holding the user's sockets
/// delivers it.
pub struct RedisBackplane {
    local: Arc<InProcessRegistry>,
    pool: Pool,
    channel: String,
}

impl RedisBackplane {
    pub async fn connect(redis_url: &str) -> Result<Self, RealtimeError> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| RealtimeError::Pool(format!("Pool creation error: {}", e)))?;

        let mut conn = pool
            .get()
            .await
            .map_err(|e| RealtimeError::Pool(format!("Connection error: {}", e)))?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis notification backplane connected");

        Ok(Self {
            local: Arc::new(InProcessRegistry::new()),
            pool,
            channel: DEFAULT_CHANNEL.to_string(),
        })
    }

    pub fn local(&self) -> Arc<InProcessRegistry> {
        self.local.clone()
    }

    /// Subscribes to the channel and delivers every message to local
    /// connections. Resubscribes after connection loss.
    pub fn spawn_subscriber(&self, redis_url: String) -> JoinHandle<()> {
        let local = self.local.clone();
        let channel = self.channel.clone();

        tokio::spawn(async move {
            loop {
                if let Err(e) = subscribe(&redis_url, &channel, &local).await {
                    error!("Backplane subscription on {} failed: {}", channel, e);
                }
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        })
    }

    async fn publish(&self, message: &BackplaneMessage) -> Result<i64, RealtimeError> {
        let payload = serde_json::to_string(message)?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| RealtimeError::Pool(e.to_string()))?;
        let receivers: i64 = conn.publish(&self.channel, payload).await?;
        Ok(receivers)
    }
}

async fn subscribe(
    redis_url: &str,
    channel: &str,
    local: &InProcessRegistry,
) -> Result<(), RealtimeError> {
    let client = redis::Client::open(redis_url)?;
    let mut pubsub = client.get_async_connection().await?.into_pubsub();
    pubsub.subscribe(channel).await?;
    info!("Subscribed to backplane channel {}", channel);

    let mut messages = pubsub.on_message();
    while let Some(msg) = messages.next().await {
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Unreadable backplane payload: {}", e);
                continue;
            }
        };
        match serde_json::from_str::<BackplaneMessage>(&payload) {
            Ok(message) => {
                let delivered = local.deliver(message.role, message.user_id, &message.envelope).await;
                debug!("Backplane delivered {} locally to {} connection(s)", message.envelope.event, delivered);
            }
            Err(e) => warn!("Malformed backplane message: {}", e),
        }
    }
    Ok(())
}

#[async_trait]
impl ConnectionRegistry for RedisBackplane {
    async fn attach(&self, connection: ConnectionId, outlet: Outlet) {
        self.local.attach(connection, outlet).await;
    }

    async fn register(&self, role: Role, user_id: Uuid, connection: ConnectionId) {
        self.local.register(role, user_id, connection).await;
    }

    async fn unregister(&self, connection: ConnectionId) {
        self.local.unregister(connection).await;
    }

    async fn list_connections(&self, role: Role, user_id: Uuid) -> Vec<ConnectionId> {
        self.local.list_connections(role, user_id).await
    }

    async fn send_to(&self, connection: ConnectionId, envelope: Envelope) -> bool {
        self.local.send_to(connection, envelope).await
    }

    async fn notify(&self, role: Role, user_id: Uuid, event: &str, payload: Value) {
        let message = BackplaneMessage {
            role,
            user_id,
            envelope: Envelope::new(event, payload),
        };

        match self.publish(&message).await {
            Ok(receivers) if receivers > 0 => {
                debug!("Published {} for {} {} to {} instance(s)", event, role, user_id, receivers);
            }
            Ok(_) => {
                // Nobody subscribed, not even this instance.
                self.local.deliver(role, user_id, &message.envelope).await;
            }
            Err(e) => {
                warn!("Backplane publish failed ({}), delivering {} locally", e, event);
                self.local.deliver(role, user_id, &message.envelope).await;
            }
        }
    }
}
