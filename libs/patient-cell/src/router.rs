use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers::*;

pub fn patient_routes(state: AppState) -> Router {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/post-history", post(post_history))
        .route("/history", get(get_history))
        .route("/favorites", post(add_favorite).get(get_favorites))
        .route("/favorites/{doctor_id}", delete(remove_favorite))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
