use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{AddFavoriteRequest, PostHistoryRequest, UpdatePatientRequest};
use crate::services::{FavoritesService, PatientService};

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient = PatientService::new(&state).profile(&user).await?;
    Ok(Json(json!(patient)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = PatientService::new(&state).update_profile(&user, request).await?;
    Ok(Json(json!(patient)))
}

pub async fn post_history(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<PostHistoryRequest>,
) -> Result<Json<Value>, AppError> {
    let history = PatientService::new(&state).save_history(&user, request).await?;
    Ok(Json(json!({
        "message": "Medical history saved successfully.",
        "history": history
    })))
}

pub async fn get_history(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let history = PatientService::new(&state).history(&user).await?;
    Ok(Json(json!({ "history": history })))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<AddFavoriteRequest>,
) -> Result<Json<Value>, AppError> {
    let favorites = FavoritesService::new(&state).add(&user, request.doctor_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Doctor added to favorites",
        "favorites": favorites
    })))
}

pub async fn get_favorites(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let favorites = FavoritesService::new(&state).list(&user).await?;
    Ok(Json(json!({ "favorites": favorites })))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let favorites = FavoritesService::new(&state).remove(&user, doctor_id).await?;
    Ok(Json(json!({
        "message": "Doctor removed from favorites",
        "favorites": favorites
    })))
}
