use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{
    CreateListingRequest, DeleteSlotRequest, DoctorSearchQuery, SaveSlotsRequest,
    SetAvailabilityRequest, SlotsForDateQuery, StatusUpdateRequest, UpdateDoctorRequest,
};
use crate::services::profile::ListingOutcome;
use crate::services::{
    AvailabilityService, DoctorSearchService, DoctorService, PatientHistoryService, ScheduleService,
};

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

pub async fn get_all_doctors(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let doctors = DoctorService::new(&state).list_all().await?;
    Ok(Json(json!(doctors)))
}

pub async fn get_available_doctors(
    State(state): State<AppState>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let doctors = DoctorSearchService::new(&state).available_doctors(query).await?;
    Ok(Json(json!(doctors)))
}

pub async fn get_doctor_slots_for_date(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotsForDateQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = AvailabilityService::new(&state)
        .slots_for_date(doctor_id, query.date.as_deref())
        .await?;
    Ok(Json(json!(slots)))
}

// ==============================================================================
// DOCTOR HANDLERS (doctor role required)
// ==============================================================================

pub async fn create_listing(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user.account_id()?;
    let (doctor, outcome) = DoctorService::new(&state)
        .create_or_update_listing(user_id, request)
        .await?;

    Ok(match outcome {
        ListingOutcome::Created => (StatusCode::CREATED, Json(json!(doctor))),
        ListingOutcome::Updated => (
            StatusCode::OK,
            Json(json!({
                "message": "Doctor profile updated successfully",
                "doctor": doctor
            })),
        ),
    })
}

pub async fn get_my_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let doctor = DoctorService::new(&state).for_account(user.account_id()?).await?;
    debug!("Serving profile of doctor {}", doctor.id);

    Ok((
        [(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")],
        Json(json!(doctor)),
    ))
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&state)
        .update_profile(user.account_id()?, request)
        .await?;
    Ok(Json(json!(doctor)))
}

pub async fn set_availability(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let availability = AvailabilityService::new(&state)
        .set_availability(user.account_id()?, request.slots)
        .await?;

    Ok(Json(json!({
        "message": "Availability updated successfully",
        "availability": availability
    })))
}

pub async fn save_time_slots(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<SaveSlotsRequest>,
) -> Result<Json<Value>, AppError> {
    let availability = AvailabilityService::new(&state)
        .save_flat_slots(user.account_id()?, request.slots)
        .await?;

    Ok(Json(json!({
        "message": "Time slots saved successfully",
        "availability": availability
    })))
}

pub async fn get_my_availability(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let availability = AvailabilityService::new(&state)
        .my_availability(user.account_id()?)
        .await?;
    Ok(Json(json!(availability)))
}

pub async fn delete_availability(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<DeleteSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let availability = AvailabilityService::new(&state)
        .delete_slot(user.account_id()?, request)
        .await?;

    Ok(Json(json!({
        "message": "Slot deleted successfully",
        "availability": availability
    })))
}

pub async fn get_scheduled_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = ScheduleService::new(&state)
        .scheduled_appointments(user.account_id()?)
        .await?;
    Ok(Json(json!({ "appointments": appointments })))
}

pub async fn update_appointment_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = ScheduleService::new(&state)
        .update_status(user.account_id()?, appointment_id, request)
        .await?;
    Ok(Json(json!(appointment)))
}

pub async fn get_patient_history(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let history = PatientHistoryService::new(&state).history_for(patient_id).await?;
    Ok(Json(json!(history)))
}
