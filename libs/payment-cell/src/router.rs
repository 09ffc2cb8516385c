use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn payment_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/create-order/{appointment_id}", post(handlers::create_payment_order))
        .route("/verify/{appointment_id}", post(handlers::verify_payment))
        .route("/status/{appointment_id}", get(handlers::get_payment_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
