use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::VerifyPaymentRequest;
use crate::services::PaymentService;

pub async fn create_payment_order(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let order = PaymentService::new(&state)
        .create_order(user.account_id()?, appointment_id)
        .await?;
    Ok(Json(json!(order)))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let verified = PaymentService::new(&state)
        .verify(user.account_id()?, appointment_id, request)
        .await?;

    let message = if verified.mock {
        "Payment verified successfully (Mock)"
    } else {
        "Payment successful"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "paymentId": verified.payment_id
    })))
}

pub async fn get_payment_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let status = PaymentService::new(&state)
        .status(user.account_id()?, appointment_id)
        .await?;
    Ok(Json(json!(status)))
}
