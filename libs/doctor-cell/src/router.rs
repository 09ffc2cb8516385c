use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_utils::authz::doctor_only;
use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn doctor_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/all", get(handlers::get_all_doctors))
        .route("/available", get(handlers::get_available_doctors))
        .route("/{doctor_id}/slots", get(handlers::get_doctor_slots_for_date));

    // Layers run bottom-up: authenticate first, then require the doctor role.
    let doctor_routes = Router::new()
        .route("/create-listing", post(handlers::create_listing))
        .route("/profile", get(handlers::get_my_profile).put(handlers::update_my_profile))
        .route(
            "/slots",
            post(handlers::set_availability)
                .get(handlers::get_my_availability)
                .delete(handlers::delete_availability),
        )
        .route("/save-slots", post(handlers::save_time_slots))
        .route("/appointments", get(handlers::get_scheduled_appointments))
        .route("/appointments/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/patient-history/{patient_id}", get(handlers::get_patient_history))
        .layer(middleware::from_fn(doctor_only))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(doctor_routes)
        .with_state(state)
}
