use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use futures::{SinkExt, StreamExt};
use headers::{authorization::Bearer, Authorization};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_realtime::Envelope;
use shared_utils::{jwt::validate_token, AppState};

use crate::models::WsQuery;
use crate::services::SocketSession;

/// `GET /ws?token=<jwt>`. The token is checked before the upgrade is
/// accepted; a bearer header works as well.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let header_token = bearer.map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());
    let account = authenticate(&state.config, header_token.or(query.token))?;

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    info!("Socket upgrade accepted for {}", account);
    Ok(ws.on_upgrade(move |socket| run_socket(socket, state, account)))
}

/// Resolves the account id a socket token names.
pub fn authenticate(config: &AppConfig, token: Option<String>) -> Result<Uuid, AppError> {
    let token = token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Auth("Missing token".to_string()))?;

    let user = validate_token(&token, &config.supabase_jwt_secret).map_err(AppError::Auth)?;
    user.account_id()
}

/// Writer task drains the session outlet into the socket; this loop feeds
/// incoming frames to the session until either side goes away.
async fn run_socket(socket: WebSocket, state: AppState, account: Uuid) {
    let (mut sink, mut stream) = socket.split();
    let (outlet, mut outbox) = mpsc::unbounded_channel::<Envelope>();
    let session = SocketSession::open(&state, account, outlet).await;
    let connection = session.connection_id();

    let mut writer = tokio::spawn(async move {
        while let Some(envelope) = outbox.recv().await {
            let text = match serde_json::to_string(&envelope) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Dropping unserializable {} frame: {}", envelope.event, e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => session.on_text(text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("Socket {} read error: {}", connection, e);
                    break;
                }
                // Ping/pong is answered by the transport.
                Some(Ok(_)) => {}
            },
            _ = &mut writer => {
                debug!("Socket {} writer finished", connection);
                break;
            }
        }
    }

    session.close().await;
    writer.abort();
}
