use axum::{routing::get, Router};

use shared_utils::AppState;

use crate::handlers;

/// The socket authenticates itself from the query string or the
/// `Authorization` header, so it sits outside the bearer middleware.
pub fn notification_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::ws_upgrade))
        .with_state(state)
}
